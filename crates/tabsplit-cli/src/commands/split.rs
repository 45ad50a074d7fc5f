//! Split and summary commands

use anyhow::{Context, Result};
use tabsplit_core::completion::unassigned_items;
use tabsplit_core::db::Database;
use tabsplit_core::split::{calculate_split, generate_shareable_summary};

use super::{money, truncate};

pub fn cmd_split(db: &Database, user: &str, receipt_id: i64, json: bool) -> Result<()> {
    let receipt = db
        .get_user_receipt(user, receipt_id)
        .with_context(|| format!("Receipt #{} not found", receipt_id))?;
    let splits = calculate_split(&receipt)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&splits)?);
        return Ok(());
    }

    println!();
    println!("💸 Split for #{}: {}", receipt.id, receipt.restaurant_key());
    println!("{}", "─".repeat(70));
    println!(
        "  {:<20} {:>10} {:>10} {:>10} {:>10}",
        "Person", "Items", "Tax", "Tip", "Total"
    );

    for split in &splits {
        println!(
            "  {:<20} {:>10} {:>10} {:>10} {:>10}",
            truncate(&split.name, 20),
            money(split.subtotal),
            money(split.tax_share),
            money(split.tip_share),
            money(split.total)
        );
    }

    let allocated: f64 = splits.iter().map(|s| s.total).sum();
    println!("{}", "─".repeat(70));
    println!(
        "  Allocated {} of {}",
        money(allocated),
        money(receipt.total)
    );

    let unassigned = unassigned_items(&receipt);
    if !unassigned.is_empty() {
        println!();
        println!("  ⚠️  Unassigned:");
        for item in &unassigned {
            println!(
                "     {} x {} {}",
                item.quantity,
                item.name,
                money(item.price * item.quantity as f64)
            );
        }
    }

    println!();
    Ok(())
}

pub fn cmd_summary(db: &Database, user: &str, receipt_id: i64) -> Result<()> {
    let receipt = db
        .get_user_receipt(user, receipt_id)
        .with_context(|| format!("Receipt #{} not found", receipt_id))?;
    let splits = calculate_split(&receipt)?;
    println!("{}", generate_shareable_summary(&receipt, &splits));
    Ok(())
}
