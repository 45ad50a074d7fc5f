//! Finalization ledger
//!
//! Commits a user's share of a receipt into their per-restaurant spend. The
//! at-most-once guarantee lives in the database layer; this service resolves
//! ownership, the share amount and the visit date.

use chrono::Local;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{FinalizeOutcome, Receipt};
use crate::split::calculate_split;

pub struct FinalizationLedger<'a> {
    db: &'a Database,
}

impl<'a> FinalizationLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Finalize `receipt_id` for `user_id` with an explicit share
    ///
    /// Repeat calls return `AlreadyFinalized` and leave the aggregate alone.
    pub fn finalize(&self, user_id: &str, receipt_id: i64, amount: f64) -> Result<FinalizeOutcome> {
        let receipt = self.db.get_user_receipt(user_id, receipt_id)?;
        self.commit(&receipt, amount)
    }

    /// Finalize with the owner's computed split total as the share
    pub fn finalize_owner_share(&self, user_id: &str, receipt_id: i64) -> Result<FinalizeOutcome> {
        let receipt = self.db.get_user_receipt(user_id, receipt_id)?;
        if receipt.is_complete {
            debug!(receipt = receipt_id, "Receipt already finalized");
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        let amount = owner_share(&receipt)?;
        self.commit(&receipt, amount)
    }

    /// Delete a receipt owned by `user_id`, reversing any finalized share
    pub fn delete(&self, user_id: &str, receipt_id: i64) -> Result<()> {
        let receipt = self.db.get_user_receipt(user_id, receipt_id)?;
        if !self.db.delete_receipt(receipt_id)? {
            return Err(Error::NotFound(format!("receipt {}", receipt_id)));
        }

        if receipt.is_complete {
            info!(
                receipt = receipt_id,
                restaurant = %receipt.restaurant_key(),
                share = receipt.finalized_share.unwrap_or_default(),
                "Finalized receipt deleted, ledger reversed"
            );
        } else {
            info!(receipt = receipt_id, "Receipt deleted");
        }
        Ok(())
    }

    fn commit(&self, receipt: &Receipt, amount: f64) -> Result<FinalizeOutcome> {
        let visit_date = receipt
            .visit_date()
            .unwrap_or_else(|| Local::now().date_naive());

        let outcome = self.db.finalize_receipt(receipt.id, amount, visit_date)?;
        match &outcome {
            FinalizeOutcome::Applied { restaurant, amount } => info!(
                receipt = receipt.id,
                restaurant = %restaurant,
                amount = *amount,
                visit = %visit_date,
                "Receipt finalized"
            ),
            FinalizeOutcome::AlreadyFinalized => {
                debug!(receipt = receipt.id, "Receipt already finalized")
            }
        }
        Ok(outcome)
    }
}

/// The owner's split total for `receipt`
pub fn owner_share(receipt: &Receipt) -> Result<f64> {
    let owner = receipt
        .owner()
        .ok_or_else(|| Error::InvalidState(format!("Receipt {} has no owner", receipt.id)))?;

    calculate_split(receipt)?
        .into_iter()
        .find(|s| s.person_id == owner.id)
        .map(|s| s.total)
        .ok_or_else(|| Error::InvalidState(format!("Receipt {} has no owner split", receipt.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedItem, ExtractedReceipt, ExtractionSource};

    fn saved(db: &Database, user: &str, date: Option<&str>) -> Receipt {
        let extracted = ExtractedReceipt {
            restaurant_name: Some("Joe's Diner".into()),
            restaurant_address: None,
            date: date.map(String::from),
            items: vec![
                ExtractedItem {
                    name: "Burger".into(),
                    quantity: 1,
                    price: 12.0,
                },
                ExtractedItem {
                    name: "Fries".into(),
                    quantity: 1,
                    price: 4.0,
                },
            ],
            subtotal: 16.0,
            tax: 1.6,
            tip: 0.0,
            total: 17.6,
            confidence: 90.0,
            extraction_source: ExtractionSource::Llm,
        };
        let receipt = Receipt::from_extracted(user, &extracted, "Me");
        let id = db.create_receipt(&receipt).unwrap();
        db.get_receipt(id).unwrap().unwrap()
    }

    #[test]
    fn test_finalize_owner_share() {
        let db = Database::in_memory().unwrap();
        let mut r = saved(&db, "u1", Some("2024-01-15"));
        let alice = r.add_person("Alice", None, false).unwrap();
        r.assign_item("item-1", &["person-1".to_string(), alice.clone()])
            .unwrap();
        r.assign_item("item-2", &[alice]).unwrap();
        db.update_receipt(&r).unwrap();

        let ledger = FinalizationLedger::new(&db);
        let outcome = ledger.finalize_owner_share("u1", r.id).unwrap();

        // Owner: half the burger plus proportional tax (6 / 16 * 1.6)
        let FinalizeOutcome::Applied { amount, .. } = outcome else {
            panic!("expected Applied, got {:?}", outcome);
        };
        assert!((amount - 6.6).abs() < 1e-9);

        let agg = db
            .get_restaurant_aggregate("u1", "Joe's Diner")
            .unwrap()
            .unwrap();
        assert!((agg.total_spent - 6.6).abs() < 1e-9);
        assert_eq!(agg.last_visit.unwrap().to_string(), "2024-01-15");

        assert_eq!(
            ledger.finalize_owner_share("u1", r.id).unwrap(),
            FinalizeOutcome::AlreadyFinalized
        );
    }

    #[test]
    fn test_finalize_is_scoped_to_owner() {
        let db = Database::in_memory().unwrap();
        let r = saved(&db, "u1", None);
        let ledger = FinalizationLedger::new(&db);

        assert!(matches!(
            ledger.finalize("u2", r.id, 5.0),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(ledger.delete("u2", r.id), Err(Error::NotFound(_))));
        assert!(!db.get_receipt(r.id).unwrap().unwrap().is_complete);
    }

    #[test]
    fn test_finalize_without_date_uses_today() {
        let db = Database::in_memory().unwrap();
        let r = saved(&db, "u1", Some("last tuesday"));
        let ledger = FinalizationLedger::new(&db);
        ledger.finalize("u1", r.id, 3.0).unwrap();

        let agg = db
            .get_restaurant_aggregate("u1", "Joe's Diner")
            .unwrap()
            .unwrap();
        assert_eq!(agg.last_visit, Some(Local::now().date_naive()));
    }

    #[test]
    fn test_delete_through_ledger() {
        let db = Database::in_memory().unwrap();
        let r = saved(&db, "u1", Some("2024-01-15"));
        let ledger = FinalizationLedger::new(&db);
        ledger.finalize("u1", r.id, 9.0).unwrap();

        ledger.delete("u1", r.id).unwrap();
        assert!(db.get_receipt(r.id).unwrap().is_none());
        assert!(db
            .get_restaurant_aggregate("u1", "Joe's Diner")
            .unwrap()
            .is_none());
        assert!(matches!(ledger.delete("u1", r.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_owner_share_without_people() {
        let db = Database::in_memory().unwrap();
        let mut r = saved(&db, "u1", None);
        r.people.clear();
        assert!(matches!(owner_share(&r), Err(Error::InvalidState(_))));
    }
}
