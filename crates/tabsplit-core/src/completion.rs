//! Assignment completeness
//!
//! Derived views over a receipt snapshot. This is readiness to finalize, not
//! the persisted `Receipt::is_complete` flag the ledger sets.

use serde::Serialize;

use crate::models::{Receipt, UnassignedItem};

/// True iff the receipt has at least one item and every item is assigned
pub fn is_complete(receipt: &Receipt) -> bool {
    !receipt.items.is_empty() && receipt.items.iter().all(|i| i.is_assigned())
}

pub fn unassigned_items(receipt: &Receipt) -> Vec<UnassignedItem> {
    receipt
        .items
        .iter()
        .filter(|i| !i.is_assigned())
        .map(|i| UnassignedItem {
            name: i.name.clone(),
            price: i.price,
            quantity: i.quantity,
        })
        .collect()
}

/// Assigned vs total item counts, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub assigned: usize,
    pub total: usize,
}

pub fn progress(receipt: &Receipt) -> Progress {
    Progress {
        assigned: receipt.items.iter().filter(|i| i.is_assigned()).count(),
        total: receipt.items.len(),
    }
}
