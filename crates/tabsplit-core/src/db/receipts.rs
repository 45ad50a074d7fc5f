//! Receipt operations
//!
//! Finalization columns (`is_complete`, `finalized_share`, `ledger_key`,
//! `visit_date`) are written only by the ledger in `restaurants.rs`.

use rusqlite::{params, OptionalExtension};

use super::{json_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::*;

const RECEIPT_COLUMNS: &str = "id, user_id, restaurant_name, restaurant_address, receipt_date,
    people_json, items_json, splits_json, subtotal, tax, tip, total,
    tax_distribution, tip_distribution, extraction_source, confidence,
    is_complete, finalized_share, version, created_at, updated_at";

impl Database {
    /// Insert a new receipt, returning its id (version starts at 1)
    pub fn create_receipt(&self, receipt: &Receipt) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO receipts (user_id, restaurant_name, restaurant_address, receipt_date,
             people_json, items_json, splits_json, subtotal, tax, tip, total,
             tax_distribution, tip_distribution, extraction_source, confidence)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                receipt.user_id,
                receipt.restaurant_name,
                receipt.restaurant_address,
                receipt.date,
                serde_json::to_string(&receipt.people)?,
                serde_json::to_string(&receipt.items)?,
                serde_json::to_string(&receipt.split_calculations)?,
                receipt.subtotal,
                receipt.tax,
                receipt.tip,
                receipt.total,
                receipt.tax_distribution.as_str(),
                receipt.tip_distribution.as_str(),
                receipt.extraction_source.as_str(),
                receipt.confidence,
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(receipt = id, user = %receipt.user_id, "Receipt created");
        Ok(id)
    }

    pub fn get_receipt(&self, id: i64) -> Result<Option<Receipt>> {
        let conn = self.conn()?;
        let receipt = conn
            .query_row(
                &format!("SELECT {} FROM receipts WHERE id = ?", RECEIPT_COLUMNS),
                params![id],
                Self::row_to_receipt,
            )
            .optional()?;
        Ok(receipt)
    }

    /// Receipt `id` if it belongs to `user_id`
    pub fn get_user_receipt(&self, user_id: &str, id: i64) -> Result<Receipt> {
        self.get_receipt(id)?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("receipt {}", id)))
    }

    /// Receipts owned by `user_id`, newest first
    pub fn list_receipts(&self, user_id: &str) -> Result<Vec<Receipt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM receipts WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            RECEIPT_COLUMNS
        ))?;

        let receipts = stmt
            .query_map(params![user_id], Self::row_to_receipt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(receipts)
    }

    /// Persist edits made to a loaded receipt
    ///
    /// Conditional on `receipt.version`; fails with `Error::Conflict` when the
    /// row changed since it was read. Returns the new version.
    pub fn update_receipt(&self, receipt: &Receipt) -> Result<i64> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE receipts SET restaurant_name = ?, restaurant_address = ?, receipt_date = ?,
             people_json = ?, items_json = ?, splits_json = ?,
             subtotal = ?, tax = ?, tip = ?, total = ?,
             tax_distribution = ?, tip_distribution = ?,
             version = version + 1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND version = ?",
            params![
                receipt.restaurant_name,
                receipt.restaurant_address,
                receipt.date,
                serde_json::to_string(&receipt.people)?,
                serde_json::to_string(&receipt.items)?,
                serde_json::to_string(&receipt.split_calculations)?,
                receipt.subtotal,
                receipt.tax,
                receipt.tip,
                receipt.total,
                receipt.tax_distribution.as_str(),
                receipt.tip_distribution.as_str(),
                receipt.id,
                receipt.version,
            ],
        )?;

        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM receipts WHERE id = ?)",
                params![receipt.id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                Error::Conflict {
                    id: receipt.id,
                    expected: receipt.version,
                }
            } else {
                Error::NotFound(format!("receipt {}", receipt.id))
            });
        }

        Ok(receipt.version + 1)
    }

    fn row_to_receipt(row: &rusqlite::Row) -> rusqlite::Result<Receipt> {
        let people: String = row.get(5)?;
        let items: String = row.get(6)?;
        let splits: String = row.get(7)?;
        let tax_mode: String = row.get(12)?;
        let tip_mode: String = row.get(13)?;
        let source: String = row.get(14)?;
        let created_at: String = row.get(19)?;
        let updated_at: String = row.get(20)?;

        Ok(Receipt {
            id: row.get(0)?,
            user_id: row.get(1)?,
            restaurant_name: row.get(2)?,
            restaurant_address: row.get(3)?,
            date: row.get(4)?,
            people: json_column(5, &people)?,
            items: json_column(6, &items)?,
            split_calculations: json_column(7, &splits)?,
            subtotal: row.get(8)?,
            tax: row.get(9)?,
            tip: row.get(10)?,
            total: row.get(11)?,
            tax_distribution: tax_mode.parse().unwrap_or_default(),
            tip_distribution: tip_mode.parse().unwrap_or_default(),
            extraction_source: source.parse().unwrap_or_default(),
            confidence: row.get(15)?,
            is_complete: row.get(16)?,
            finalized_share: row.get(17)?,
            version: row.get(18)?,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }
}
