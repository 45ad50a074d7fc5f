//! Split allocation
//!
//! `calculate_split` is a pure function of the receipt snapshot: item shares
//! first, then tax and tip by each distribution mode.

use std::collections::HashMap;
use std::fmt::Write;

use crate::error::{Error, Result};
use crate::models::{DistributionMode, ItemShare, Receipt, SplitCalculation};

/// Compute every person's share of `receipt`
///
/// Output order follows `receipt.people`. Unassigned items count toward no
/// one, and proportional tax/tip is weighted by the assigned subtotal only.
pub fn calculate_split(receipt: &Receipt) -> Result<Vec<SplitCalculation>> {
    if receipt.people.is_empty() {
        return Err(Error::Validation(
            "Receipt has no people to split between".into(),
        ));
    }

    let index: HashMap<&str, usize> = receipt
        .people
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut splits: Vec<SplitCalculation> = receipt
        .people
        .iter()
        .map(|p| SplitCalculation {
            person_id: p.id.clone(),
            name: p.name.clone(),
            subtotal: 0.0,
            tax_share: 0.0,
            tip_share: 0.0,
            total: 0.0,
            items: Vec::new(),
        })
        .collect();

    for item in receipt.items.iter().filter(|i| i.is_assigned()) {
        let line_total = item.line_total();
        let per_person = line_total / item.assigned_to.len() as f64;

        for person_id in &item.assigned_to {
            let slot = *index.get(person_id.as_str()).ok_or_else(|| {
                Error::InvalidState(format!(
                    "Item {} is assigned to unknown person {}",
                    item.id, person_id
                ))
            })?;
            let split = &mut splits[slot];
            split.subtotal += per_person;
            split.items.push(ItemShare {
                item_name: item.name.clone(),
                full_price: line_total,
                share_amount: per_person,
                shared_with: item
                    .assigned_to
                    .iter()
                    .filter(|other| *other != person_id)
                    .cloned()
                    .collect(),
            });
        }
    }

    let allocated: f64 = splits.iter().map(|s| s.subtotal).sum();
    let people = splits.len() as f64;

    for split in &mut splits {
        split.tax_share = share(
            receipt.tax,
            receipt.tax_distribution,
            split.subtotal,
            allocated,
            people,
        );
        split.tip_share = share(
            receipt.tip,
            receipt.tip_distribution,
            split.subtotal,
            allocated,
            people,
        );
        split.total = split.subtotal + split.tax_share + split.tip_share;
    }

    Ok(splits)
}

fn share(amount: f64, mode: DistributionMode, subtotal: f64, allocated: f64, people: f64) -> f64 {
    match mode {
        DistributionMode::Equal => amount / people,
        DistributionMode::Proportional if allocated == 0.0 => 0.0,
        DistributionMode::Proportional => subtotal / allocated * amount,
    }
}

/// Plain-text summary suitable for pasting into a chat
pub fn generate_shareable_summary(receipt: &Receipt, splits: &[SplitCalculation]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", receipt.restaurant_key());
    if let Some(ref date) = receipt.date {
        let _ = writeln!(out, "Date: {}", date);
    }
    let _ = writeln!(out, "Total: ${:.2}", receipt.total);
    out.push('\n');

    for split in splits {
        let _ = writeln!(out, "{}: ${:.2}", split.name, split.total);
    }

    let has_items = splits.iter().any(|s| !s.items.is_empty());
    if has_items {
        out.push_str("\nItems:\n");
        for split in splits {
            for item in &split.items {
                let shared = if item.shared_with.is_empty() {
                    ""
                } else {
                    " (shared)"
                };
                let _ = writeln!(
                    out,
                    "  {}: {} ${:.2}{}",
                    split.name, item.item_name, item.share_amount, shared
                );
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionSource, LineItem, Person, PersonRole};
    use chrono::Utc;

    fn person(id: &str, name: &str, role: PersonRole) -> Person {
        Person {
            id: id.into(),
            name: name.into(),
            email: None,
            is_registered_user: role == PersonRole::Owner,
            role,
        }
    }

    fn item(id: &str, name: &str, qty: u32, price: f64, assigned: &[&str]) -> LineItem {
        LineItem {
            id: id.into(),
            name: name.into(),
            quantity: qty,
            price,
            assigned_to: assigned.iter().map(|s| s.to_string()).collect(),
            notes: None,
        }
    }

    fn receipt(items: Vec<LineItem>, tax: f64, tip: f64) -> Receipt {
        let subtotal: f64 = items.iter().map(LineItem::line_total).sum();
        Receipt {
            id: 1,
            user_id: "u1".into(),
            restaurant_name: Some("Joe's Diner".into()),
            restaurant_address: None,
            date: Some("2024-01-15".into()),
            people: vec![
                person("person-1", "Me", PersonRole::Owner),
                person("person-2", "Alice", PersonRole::Guest),
            ],
            items,
            subtotal,
            tax,
            tip,
            total: subtotal + tax + tip,
            tax_distribution: DistributionMode::Proportional,
            tip_distribution: DistributionMode::Proportional,
            split_calculations: vec![],
            is_complete: false,
            finalized_share: None,
            extraction_source: ExtractionSource::Llm,
            confidence: 90.0,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_shared_burger() {
        let r = receipt(
            vec![item("item-1", "Burger", 1, 12.0, &["person-1", "person-2"])],
            0.0,
            0.0,
        );
        let splits = calculate_split(&r).unwrap();

        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].subtotal, 6.0);
        assert_eq!(splits[1].subtotal, 6.0);
        assert_eq!(splits[0].items[0].shared_with, vec!["person-2".to_string()]);
        assert_eq!(splits[1].items[0].shared_with, vec!["person-1".to_string()]);
        assert_eq!(splits[0].items[0].full_price, 12.0);
    }

    #[test]
    fn test_fully_assigned_totals_reconcile() {
        let r = receipt(
            vec![
                item("item-1", "Steak", 1, 31.0, &["person-1"]),
                item("item-2", "Soda", 3, 2.5, &["person-2"]),
                item("item-3", "Nachos", 1, 9.99, &["person-1", "person-2"]),
            ],
            4.37,
            9.0,
        );
        let splits = calculate_split(&r).unwrap();
        let sum: f64 = splits.iter().map(|s| s.total).sum();
        assert!((sum - r.total).abs() < 1e-6);
        for s in &splits {
            assert!((s.total - (s.subtotal + s.tax_share + s.tip_share)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_equal_mode_ignores_subtotals() {
        let mut r = receipt(vec![item("item-1", "Steak", 1, 40.0, &["person-1"])], 5.0, 8.0);
        r.tax_distribution = DistributionMode::Equal;
        r.tip_distribution = DistributionMode::Equal;

        let splits = calculate_split(&r).unwrap();
        assert_eq!(splits[0].tax_share, 2.5);
        assert_eq!(splits[1].tax_share, 2.5);
        assert_eq!(splits[1].tip_share, 4.0);
        assert_eq!(splits[1].subtotal, 0.0);
    }

    #[test]
    fn test_proportional_with_nothing_assigned() {
        let r = receipt(vec![item("item-1", "Steak", 1, 40.0, &[])], 5.0, 8.0);
        let splits = calculate_split(&r).unwrap();
        assert!(splits.iter().all(|s| s.tax_share == 0.0 && s.tip_share == 0.0));
        assert!(splits.iter().all(|s| s.total == 0.0));
    }

    #[test]
    fn test_proportional_uses_assigned_subtotal() {
        let r = receipt(
            vec![
                item("item-1", "Steak", 1, 30.0, &["person-1"]),
                item("item-2", "Salad", 1, 10.0, &["person-2"]),
                item("item-3", "Wine", 1, 20.0, &[]),
            ],
            8.0,
            0.0,
        );
        let splits = calculate_split(&r).unwrap();
        assert!((splits[0].tax_share - 6.0).abs() < 1e-9);
        assert!((splits[1].tax_share - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let r = receipt(
            vec![item("item-1", "Burger", 2, 7.25, &["person-1", "person-2"])],
            1.0,
            2.0,
        );
        assert_eq!(calculate_split(&r).unwrap(), calculate_split(&r).unwrap());
    }

    #[test]
    fn test_no_people_is_validation_error() {
        let mut r = receipt(vec![], 0.0, 0.0);
        r.people.clear();
        assert!(matches!(calculate_split(&r), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unknown_assignee_is_state_error() {
        let r = receipt(vec![item("item-1", "Burger", 1, 12.0, &["person-9"])], 0.0, 0.0);
        assert!(matches!(calculate_split(&r), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_shareable_summary() {
        let r = receipt(
            vec![
                item("item-1", "Burger", 1, 12.0, &["person-1", "person-2"]),
                item("item-2", "Fries", 1, 4.0, &["person-2"]),
            ],
            0.0,
            0.0,
        );
        let splits = calculate_split(&r).unwrap();
        let summary = generate_shareable_summary(&r, &splits);

        assert!(summary.starts_with("Joe's Diner\nDate: 2024-01-15\nTotal: $16.00"));
        assert!(summary.contains("Me: $6.00"));
        assert!(summary.contains("Alice: $10.00"));
        assert!(summary.contains("  Alice: Burger $6.00 (shared)"));
        assert!(
            summary.contains("  Alice: Fries $4.00\n") || summary.ends_with("  Alice: Fries $4.00")
        );
    }
}
