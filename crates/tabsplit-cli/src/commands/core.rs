//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Load tabsplit.toml (embedded defaults or user override)
//! - `edit_receipt` - Load, mutate and save a receipt with a version check
//! - `cmd_init` - Initialize the database
//! - `cmd_health` - Check collaborator connectivity

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tabsplit_core::ai::{AIBackend, AIClient};
use tabsplit_core::config::Config;
use tabsplit_core::db::Database;
use tabsplit_core::models::Receipt;
use tabsplit_core::ocr::{OcrClient, OcrEngine};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_config() -> Result<Config> {
    Config::load().context("Failed to load tabsplit.toml")
}

/// Apply `edit` to receipt `id` and persist it
///
/// Fails without saving if `edit` fails or another writer updated the
/// receipt since it was loaded.
pub fn edit_receipt<T>(
    db: &Database,
    user: &str,
    id: i64,
    edit: impl FnOnce(&mut Receipt) -> tabsplit_core::Result<T>,
) -> Result<(Receipt, T)> {
    let mut receipt = db
        .get_user_receipt(user, id)
        .with_context(|| format!("Receipt #{} not found", id))?;

    let out = edit(&mut receipt)?;
    receipt.version = db
        .update_receipt(&receipt)
        .with_context(|| format!("Failed to save receipt #{}", id))?;

    if receipt.is_complete {
        println!(
            "   ⚠️  Receipt #{} is finalized; restaurant totals keep the committed share",
            id
        );
    }
    Ok((receipt, out))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Extract a receipt: tabsplit extract --bucket receipts --key dinner.jpg");
    println!("  2. Add friends:       tabsplit people add 1 Alice");
    println!("  3. Split it:          tabsplit assign 1 item-1 person-1 person-2");

    Ok(())
}

pub async fn cmd_health() -> Result<()> {
    println!();
    println!("🩺 Collaborator Health");
    println!("   ─────────────────────────────");

    match OcrClient::from_env() {
        Ok(ocr) => {
            let ok = ocr.health_check().await;
            println!(
                "   {} OCR ({}): {}",
                if ok { "✅" } else { "❌" },
                ocr.name(),
                if ok { "reachable" } else { "unreachable" }
            );
        }
        Err(e) => println!("   ❌ OCR: {}", e),
    }

    match AIClient::from_env() {
        Ok(Some(ai)) => {
            let ok = ai.health_check().await;
            println!(
                "   {} LLM {} at {}: {}",
                if ok { "✅" } else { "❌" },
                ai.model(),
                ai.host(),
                if ok { "reachable" } else { "unreachable" }
            );
        }
        Ok(None) => {
            println!("   💡 LLM: not configured, extraction uses line patterns only");
            println!("      Set OLLAMA_HOST or AI_BACKEND to enable structured parsing");
        }
        Err(e) => println!("   ❌ LLM: {}", e),
    }

    println!();
    Ok(())
}
