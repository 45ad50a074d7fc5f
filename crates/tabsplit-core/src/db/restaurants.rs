//! Finalization ledger and restaurant aggregates
//!
//! A receipt contributes to its restaurant aggregate at most once. The
//! `is_complete = 0` guard on the finalize UPDATE is the idempotency check,
//! and the share and aggregate key recorded on the row are what a later
//! delete reverses.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{restaurant_key, FinalizeOutcome, RestaurantAggregate};

impl Database {
    /// Mark a receipt finalized and add `amount` to its restaurant aggregate
    ///
    /// Both writes happen in one transaction. A receipt that is already
    /// finalized is left untouched and `AlreadyFinalized` is returned, even
    /// if `amount` differs from the recorded share.
    pub fn finalize_receipt(
        &self,
        receipt_id: i64,
        amount: f64,
        visit_date: NaiveDate,
    ) -> Result<FinalizeOutcome> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidState(format!(
                "Finalized share must be a non-negative amount, got {}",
                amount
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(String, Option<String>)> = tx
            .query_row(
                "SELECT user_id, restaurant_name FROM receipts WHERE id = ?",
                params![receipt_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (user_id, restaurant_name) =
            row.ok_or_else(|| Error::NotFound(format!("receipt {}", receipt_id)))?;
        let key = restaurant_key(restaurant_name.as_deref()).to_string();
        let visit = visit_date.format("%Y-%m-%d").to_string();

        let changed = tx.execute(
            "UPDATE receipts SET is_complete = 1, finalized_share = ?, ledger_key = ?,
             visit_date = ?, version = version + 1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND is_complete = 0",
            params![amount, key, visit, receipt_id],
        )?;

        if changed == 0 {
            // Nothing to undo; dropping the transaction rolls it back
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        tx.execute(
            "INSERT INTO restaurant_aggregates (user_id, name, visit_count, total_spent, last_visit)
             VALUES (?1, ?2, 1, ?3, ?4)
             ON CONFLICT(user_id, name) DO UPDATE SET
                visit_count = visit_count + 1,
                total_spent = total_spent + excluded.total_spent,
                last_visit = CASE
                    WHEN last_visit IS NULL OR excluded.last_visit > last_visit
                    THEN excluded.last_visit
                    ELSE last_visit
                END",
            params![user_id, key, amount, visit],
        )?;

        tx.commit()?;

        Ok(FinalizeOutcome::Applied {
            restaurant: key,
            amount,
        })
    }

    /// Delete a receipt, reversing its ledger contribution if it was finalized
    ///
    /// Returns false when no such receipt exists. The aggregate row is removed
    /// once its last finalized receipt is gone.
    pub fn delete_receipt(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(String, bool, Option<f64>, Option<String>)> = tx
            .query_row(
                "SELECT user_id, is_complete, finalized_share, ledger_key
                 FROM receipts WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((user_id, is_complete, share, ledger_key)) = row else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE extraction_jobs SET receipt_id = NULL WHERE receipt_id = ?",
            params![id],
        )?;
        tx.execute("DELETE FROM receipts WHERE id = ?", params![id])?;

        if let (true, Some(share), Some(key)) = (is_complete, share, ledger_key) {
            tx.execute(
                "UPDATE restaurant_aggregates SET
                    visit_count = MAX(visit_count - 1, 0),
                    total_spent = MAX(total_spent - ?3, 0),
                    last_visit = (
                        SELECT MAX(visit_date) FROM receipts
                        WHERE user_id = ?1 AND ledger_key = ?2 AND is_complete = 1
                    )
                 WHERE user_id = ?1 AND name = ?2",
                params![user_id, key, share],
            )?;
            tx.execute(
                "DELETE FROM restaurant_aggregates
                 WHERE user_id = ? AND name = ? AND visit_count <= 0",
                params![user_id, key],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn get_restaurant_aggregate(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<RestaurantAggregate>> {
        let conn = self.conn()?;
        let aggregate = conn
            .query_row(
                "SELECT user_id, name, visit_count, total_spent, last_visit
                 FROM restaurant_aggregates WHERE user_id = ? AND name = ?",
                params![user_id, name],
                Self::row_to_aggregate,
            )
            .optional()?;
        Ok(aggregate)
    }

    /// All aggregates for a user, biggest spend first
    pub fn list_restaurant_aggregates(&self, user_id: &str) -> Result<Vec<RestaurantAggregate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, name, visit_count, total_spent, last_visit
             FROM restaurant_aggregates WHERE user_id = ?
             ORDER BY total_spent DESC, name",
        )?;

        let aggregates = stmt
            .query_map(params![user_id], Self::row_to_aggregate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(aggregates)
    }

    fn row_to_aggregate(row: &rusqlite::Row) -> rusqlite::Result<RestaurantAggregate> {
        let last_visit: Option<String> = row.get(4)?;
        Ok(RestaurantAggregate {
            user_id: row.get(0)?,
            name: row.get(1)?,
            visit_count: row.get(2)?,
            total_spent: row.get(3)?,
            last_visit: last_visit
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        })
    }
}
