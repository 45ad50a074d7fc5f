//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_config, edit_receipt), init and health
//! - `extract` - OCR + parsing of a receipt image into a saved receipt
//! - `receipts` - Receipt listing, details, deletion, line items and extraction jobs
//! - `people` - Adding and removing people on a receipt
//! - `assign` - Item assignment and tax/tip distribution
//! - `split` - Per-person shares and the shareable summary
//! - `ledger` - Finalization and restaurant totals

pub mod assign;
pub mod core;
pub mod extract;
pub mod ledger;
pub mod people;
pub mod receipts;
pub mod split;

// Re-export command functions for main.rs
pub use assign::*;
pub use core::*;
pub use extract::*;
pub use ledger::*;
pub use people::*;
pub use receipts::*;
pub use split::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount as dollars
pub fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}
