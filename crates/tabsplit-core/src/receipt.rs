//! Editing operations on the receipt aggregate
//!
//! Every mutation validates its input before touching the receipt and
//! recomputes `split_calculations` before returning. None of them change the
//! finalization flag; that belongs to the ledger.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{
    DistributionMode, ExtractedReceipt, LineItem, Person, PersonRole, Receipt,
};
use crate::split::calculate_split;

const PERSON_PREFIX: &str = "person-";
const ITEM_PREFIX: &str = "item-";

impl Receipt {
    /// New unsaved receipt with the owner as its only person and every item unassigned
    pub fn from_extracted(user_id: &str, extracted: &ExtractedReceipt, owner_name: &str) -> Self {
        let now = Utc::now();
        let owner = Person {
            id: format!("{}1", PERSON_PREFIX),
            name: owner_name.to_string(),
            email: None,
            is_registered_user: true,
            role: PersonRole::Owner,
        };
        let items = extracted
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| LineItem {
                id: format!("{}{}", ITEM_PREFIX, i + 1),
                name: item.name.clone(),
                quantity: item.quantity.max(1),
                price: item.price,
                assigned_to: Vec::new(),
                notes: None,
            })
            .collect();

        let mut receipt = Receipt {
            id: 0,
            user_id: user_id.to_string(),
            restaurant_name: extracted.restaurant_name.clone(),
            restaurant_address: extracted.restaurant_address.clone(),
            date: extracted.date.clone(),
            people: vec![owner],
            items,
            subtotal: extracted.subtotal,
            tax: extracted.tax,
            tip: extracted.tip,
            total: extracted.total,
            tax_distribution: DistributionMode::default(),
            tip_distribution: DistributionMode::default(),
            split_calculations: Vec::new(),
            is_complete: false,
            finalized_share: None,
            extraction_source: extracted.extraction_source,
            confidence: extracted.confidence,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        // One owner and no assignments: the split cannot fail
        receipt.split_calculations = calculate_split(&receipt).unwrap_or_default();
        receipt
    }

    /// Recompute derived fields from the current snapshot
    pub fn refresh(&mut self) -> Result<()> {
        self.split_calculations = calculate_split(self)?;
        Ok(())
    }

    /// Add a guest, returning the new person id
    pub fn add_person(
        &mut self,
        name: &str,
        email: Option<String>,
        is_registered_user: bool,
    ) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Person name cannot be empty".into()));
        }

        let id = format!(
            "{}{}",
            PERSON_PREFIX,
            next_suffix(self.people.iter().map(|p| p.id.as_str()), PERSON_PREFIX)
        );
        self.people.push(Person {
            id: id.clone(),
            name: name.to_string(),
            email: email.filter(|e| !e.trim().is_empty()),
            is_registered_user,
            role: PersonRole::Guest,
        });
        self.refresh()?;
        Ok(id)
    }

    /// Remove a guest and strip them from every assignment
    pub fn remove_person(&mut self, person_id: &str) -> Result<()> {
        let person = self
            .person(person_id)
            .ok_or_else(|| Error::InvalidState(format!("Unknown person {}", person_id)))?;
        if person.is_owner() {
            return Err(Error::InvalidState(
                "The receipt owner cannot be removed".into(),
            ));
        }

        self.people.retain(|p| p.id != person_id);
        for item in &mut self.items {
            item.assigned_to.retain(|id| id != person_id);
        }
        self.refresh()
    }

    /// Replace an item's assignment; duplicates collapse, order is kept
    pub fn assign_item(&mut self, item_id: &str, person_ids: &[String]) -> Result<()> {
        let slot = self.item_slot(item_id)?;
        if let Some(unknown) = person_ids.iter().find(|id| self.person(id).is_none()) {
            return Err(Error::InvalidState(format!("Unknown person {}", unknown)));
        }

        let mut assigned: Vec<String> = Vec::with_capacity(person_ids.len());
        for id in person_ids {
            if !assigned.contains(id) {
                assigned.push(id.clone());
            }
        }
        self.items[slot].assigned_to = assigned;
        self.refresh()
    }

    pub fn unassign_item(&mut self, item_id: &str) -> Result<()> {
        self.assign_item(item_id, &[])
    }

    /// Flip one person on an item; returns whether they are now assigned
    pub fn toggle_assignment(&mut self, item_id: &str, person_id: &str) -> Result<bool> {
        let slot = self.item_slot(item_id)?;
        if self.person(person_id).is_none() {
            return Err(Error::InvalidState(format!("Unknown person {}", person_id)));
        }

        let assigned = &mut self.items[slot].assigned_to;
        let now_assigned = if let Some(pos) = assigned.iter().position(|id| id == person_id) {
            assigned.remove(pos);
            false
        } else {
            assigned.push(person_id.to_string());
            true
        };
        self.refresh()?;
        Ok(now_assigned)
    }

    pub fn set_distribution(
        &mut self,
        tax: Option<DistributionMode>,
        tip: Option<DistributionMode>,
    ) -> Result<()> {
        if let Some(mode) = tax {
            self.tax_distribution = mode;
        }
        if let Some(mode) = tip {
            self.tip_distribution = mode;
        }
        self.refresh()
    }

    /// Add a manual item (unassigned); subtotal and total grow by its line total
    pub fn add_item(&mut self, name: &str, quantity: u32, price: f64) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Item name cannot be empty".into()));
        }
        if quantity == 0 {
            return Err(Error::Validation("Item quantity must be at least 1".into()));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(Error::Validation(format!("Invalid item price: {}", price)));
        }

        let id = format!(
            "{}{}",
            ITEM_PREFIX,
            next_suffix(self.items.iter().map(|i| i.id.as_str()), ITEM_PREFIX)
        );
        let item = LineItem {
            id: id.clone(),
            name: name.to_string(),
            quantity,
            price,
            assigned_to: Vec::new(),
            notes: None,
        };
        self.subtotal += item.line_total();
        self.total += item.line_total();
        self.items.push(item);
        self.refresh()?;
        Ok(id)
    }

    /// Remove an item; subtotal and total shrink by its line total
    pub fn remove_item(&mut self, item_id: &str) -> Result<()> {
        let slot = self.item_slot(item_id)?;
        let item = self.items.remove(slot);
        self.subtotal = (self.subtotal - item.line_total()).max(0.0);
        self.total = (self.total - item.line_total()).max(0.0);
        self.refresh()
    }

    fn item_slot(&self, item_id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| Error::InvalidState(format!("Unknown item {}", item_id)))
    }
}

/// One past the largest numeric suffix among ids with `prefix`
fn next_suffix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u32 {
    ids.filter_map(|id| id.strip_prefix(prefix)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedItem, ExtractionSource};

    fn extracted() -> ExtractedReceipt {
        ExtractedReceipt {
            restaurant_name: Some("Joe's Diner".into()),
            restaurant_address: None,
            date: Some("2024-01-15".into()),
            items: vec![
                ExtractedItem {
                    name: "Burger".into(),
                    quantity: 1,
                    price: 12.0,
                },
                ExtractedItem {
                    name: "Soda".into(),
                    quantity: 2,
                    price: 2.5,
                },
            ],
            subtotal: 17.0,
            tax: 1.7,
            tip: 3.0,
            total: 21.7,
            confidence: 91.0,
            extraction_source: ExtractionSource::Llm,
        }
    }

    #[test]
    fn test_from_extracted() {
        let r = Receipt::from_extracted("u1", &extracted(), "Me");
        assert_eq!(r.people.len(), 1);
        assert!(r.people[0].is_owner());
        assert_eq!(r.owner().map(|p| p.name.as_str()), Some("Me"));
        assert_eq!(r.items[0].id, "item-1");
        assert_eq!(r.items[1].id, "item-2");
        assert!(r.items.iter().all(|i| i.assigned_to.is_empty()));
        assert_eq!(r.split_calculations.len(), 1);
        assert!(!r.is_complete);
    }

    #[test]
    fn test_people_lifecycle() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        let alice = r.add_person("Alice", None, false).unwrap();
        let bob = r.add_person("Bob", Some("bob@example.com".into()), true).unwrap();
        assert_eq!(alice, "person-2");
        assert_eq!(bob, "person-3");

        r.assign_item("item-1", &[alice.clone(), bob.clone()]).unwrap();
        r.remove_person(&alice).unwrap();
        assert_eq!(r.items[0].assigned_to, vec![bob.clone()]);
        assert_eq!(r.split_calculations.len(), 2);

        let carol = r.add_person("Carol", None, false).unwrap();
        assert_eq!(carol, "person-4");
    }

    #[test]
    fn test_owner_cannot_be_removed() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        assert!(matches!(r.remove_person("person-1"), Err(Error::InvalidState(_))));
        assert!(matches!(r.remove_person("person-7"), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_assign_validates_and_dedupes() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        let alice = r.add_person("Alice", None, false).unwrap();

        let err = r
            .assign_item("item-1", &["person-1".into(), "ghost".into()])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(r.items[0].assigned_to.is_empty());

        r.assign_item("item-1", &[alice.clone(), "person-1".into(), alice.clone()])
            .unwrap();
        assert_eq!(r.items[0].assigned_to, vec![alice, "person-1".to_string()]);
        assert!(matches!(
            r.assign_item("item-9", &[]),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_toggle_assignment() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        assert!(r.toggle_assignment("item-2", "person-1").unwrap());
        assert_eq!(r.split_calculations[0].subtotal, 5.0);
        assert!(!r.toggle_assignment("item-2", "person-1").unwrap());
        assert_eq!(r.split_calculations[0].subtotal, 0.0);
    }

    #[test]
    fn test_set_distribution_recomputes() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        r.add_person("Alice", None, false).unwrap();
        r.set_distribution(Some(DistributionMode::Equal), None).unwrap();
        assert_eq!(r.tax_distribution, DistributionMode::Equal);
        assert_eq!(r.tip_distribution, DistributionMode::Proportional);
        assert!((r.split_calculations[1].tax_share - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_manual_items() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        let id = r.add_item("Pie", 1, 4.0).unwrap();
        assert_eq!(id, "item-3");
        assert_eq!(r.subtotal, 21.0);
        assert!((r.total - 25.7).abs() < 1e-9);

        assert!(matches!(r.add_item(" ", 1, 1.0), Err(Error::Validation(_))));
        assert!(matches!(r.add_item("Tea", 1, -1.0), Err(Error::Validation(_))));
        assert!(matches!(r.add_item("Tea", 0, 1.0), Err(Error::Validation(_))));

        r.remove_item("item-1").unwrap();
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.subtotal, 9.0);
        assert!(r.remove_item("item-1").is_err());
    }

    #[test]
    fn test_mutations_do_not_touch_finalize_flag() {
        let mut r = Receipt::from_extracted("u1", &extracted(), "Me");
        r.is_complete = true;
        r.add_person("Alice", None, false).unwrap();
        r.unassign_item("item-1").unwrap();
        assert!(r.is_complete);
    }
}
