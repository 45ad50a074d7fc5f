//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tabsplit - Split restaurant receipts between friends
#[derive(Parser)]
#[command(name = "tabsplit")]
#[command(about = "Receipt extraction and bill splitting", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tabsplit.db", global = true)]
    pub db: PathBuf,

    /// User whose receipts and restaurant totals are used
    #[arg(long, default_value = "local", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TABSPLIT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Extract a receipt image into a new receipt
    Extract {
        /// Storage bucket holding the image
        #[arg(short, long)]
        bucket: String,

        /// Object key of the image
        #[arg(short, long)]
        key: String,

        /// Print the extraction without saving a receipt
        #[arg(long)]
        dry_run: bool,
    },

    /// Receipt management (defaults to list)
    Receipts {
        #[command(subcommand)]
        action: Option<ReceiptsAction>,
    },

    /// Add or remove people on a receipt
    People {
        #[command(subcommand)]
        action: PeopleAction,
    },

    /// Add or remove line items on a receipt
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Assign an item to one or more people (replaces any assignment)
    Assign {
        /// Receipt ID
        receipt: i64,

        /// Item ID (e.g. item-1)
        item: String,

        /// Person IDs (e.g. person-1 person-2)
        #[arg(required = true, num_args = 1..)]
        people: Vec<String>,
    },

    /// Clear an item's assignment
    Unassign {
        /// Receipt ID
        receipt: i64,

        /// Item ID
        item: String,
    },

    /// Add or remove one person on an item
    Toggle {
        /// Receipt ID
        receipt: i64,

        /// Item ID
        item: String,

        /// Person ID
        person: String,
    },

    /// Set how tax and tip are distributed (equal or proportional)
    Distribution {
        /// Receipt ID
        receipt: i64,

        #[arg(long)]
        tax: Option<String>,

        #[arg(long)]
        tip: Option<String>,
    },

    /// Show each person's share
    Split {
        /// Receipt ID
        receipt: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a shareable plain-text summary
    Summary {
        /// Receipt ID
        receipt: i64,
    },

    /// Commit your share of a receipt to your restaurant totals
    Finalize {
        /// Receipt ID
        receipt: i64,

        /// Share to record (defaults to the owner's split total)
        #[arg(long)]
        amount: Option<f64>,
    },

    /// Show finalized spend per restaurant
    Restaurants,

    /// Show recent extraction jobs
    Jobs {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Check OCR and LLM backend connectivity
    Health,
}

#[derive(Subcommand)]
pub enum ReceiptsAction {
    /// List your receipts
    List,

    /// Show one receipt with people, items and assignments
    Show {
        /// Receipt ID
        id: i64,
    },

    /// Delete a receipt (reverses its finalized share)
    Delete {
        /// Receipt ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum PeopleAction {
    /// Add a guest to a receipt
    Add {
        /// Receipt ID
        receipt: i64,

        /// Display name
        name: String,

        #[arg(long)]
        email: Option<String>,

        /// The person has their own account
        #[arg(long)]
        registered: bool,
    },

    /// Remove a guest and their assignments
    Remove {
        /// Receipt ID
        receipt: i64,

        /// Person ID
        person: String,
    },
}

#[derive(Subcommand)]
pub enum ItemsAction {
    /// Add a line item the extraction missed
    Add {
        /// Receipt ID
        receipt: i64,

        /// Item name
        name: String,

        /// Unit price
        price: f64,

        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// Remove a line item
    Remove {
        /// Receipt ID
        receipt: i64,

        /// Item ID
        item: String,
    },
}
