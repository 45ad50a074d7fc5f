//! Receipt workflow CLI commands

use anyhow::{Context, Result};
use tabsplit_core::completion::{progress, unassigned_items};
use tabsplit_core::db::Database;
use tabsplit_core::ledger::FinalizationLedger;
use tabsplit_core::models::Receipt;

use super::{edit_receipt, money, truncate};

/// List the user's receipts
pub fn cmd_receipts_list(db: &Database, user: &str) -> Result<()> {
    let receipts = db.list_receipts(user)?;

    if receipts.is_empty() {
        println!("No receipts yet. Run 'tabsplit extract' to add one.");
        return Ok(());
    }

    println!("\n🧾 Receipts ({})", receipts.len());
    println!("{}", "─".repeat(70));

    for receipt in &receipts {
        let p = progress(receipt);
        let state = if receipt.is_complete {
            "✓ finalized".to_string()
        } else {
            format!("{}/{} assigned", p.assigned, p.total)
        };

        println!(
            "  #{:<5} {:<28} {:>9}  {:<10}  {}",
            receipt.id,
            truncate(receipt.restaurant_key(), 28),
            money(receipt.total),
            receipt.date.as_deref().unwrap_or("-"),
            state
        );
    }

    println!();
    Ok(())
}

/// Show people, items and assignments for one receipt
pub fn cmd_receipts_show(db: &Database, user: &str, id: i64) -> Result<()> {
    let receipt = db
        .get_user_receipt(user, id)
        .with_context(|| format!("Receipt #{} not found", id))?;
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_receipts_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    FinalizationLedger::new(db)
        .delete(user, id)
        .with_context(|| format!("Failed to delete receipt #{}", id))?;
    println!("🗑️  Deleted receipt #{}", id);
    Ok(())
}

pub fn cmd_items_add(
    db: &Database,
    user: &str,
    receipt_id: i64,
    name: &str,
    quantity: u32,
    price: f64,
) -> Result<()> {
    let (receipt, item_id) =
        edit_receipt(db, user, receipt_id, |r| r.add_item(name, quantity, price))?;
    println!(
        "➕ Added {} ({} x {}) as {}; total now {}",
        name,
        quantity,
        money(price),
        item_id,
        money(receipt.total)
    );
    Ok(())
}

pub fn cmd_items_remove(db: &Database, user: &str, receipt_id: i64, item_id: &str) -> Result<()> {
    let (receipt, _) = edit_receipt(db, user, receipt_id, |r| r.remove_item(item_id))?;
    println!("➖ Removed {}; total now {}", item_id, money(receipt.total));
    Ok(())
}

/// Recent extraction jobs
pub fn cmd_jobs(db: &Database, limit: i64) -> Result<()> {
    let jobs = db.list_extraction_jobs(limit)?;

    if jobs.is_empty() {
        println!("No extraction jobs yet");
        return Ok(());
    }

    println!("\n⚙️  Extraction Jobs ({})", jobs.len());
    println!("{}", "─".repeat(70));

    for job in &jobs {
        let source = job.source.map(|s| s.as_str()).unwrap_or("-");
        let receipt = job
            .receipt_id
            .map(|id| format!("→ #{}", id))
            .unwrap_or_default();
        println!(
            "  #{:<5} {:<10} {:<8} {:<30} {}",
            job.id,
            job.status.as_str(),
            source,
            truncate(&format!("{}/{}", job.bucket, job.key), 30),
            receipt
        );
        if let Some(ref error) = job.error {
            println!("         ❌ {}", truncate(error, 60));
        }
    }

    println!();
    Ok(())
}

pub(crate) fn print_receipt(receipt: &Receipt) {
    println!();
    println!("🧾 Receipt #{}: {}", receipt.id, receipt.restaurant_key());
    if let Some(ref address) = receipt.restaurant_address {
        println!("   {}", address);
    }
    println!(
        "   Date: {}   Source: {} ({:.0}%)",
        receipt.date.as_deref().unwrap_or("Unknown"),
        receipt.extraction_source,
        receipt.confidence
    );
    println!("{}", "─".repeat(70));

    println!("  People:");
    for person in &receipt.people {
        let role = if person.is_owner() { " (you)" } else { "" };
        println!("    {:<10} {}{}", person.id, person.name, role);
    }

    println!("  Items:");
    for item in &receipt.items {
        let assigned: Vec<&str> = item
            .assigned_to
            .iter()
            .map(|id| receipt.person(id).map(|p| p.name.as_str()).unwrap_or(id.as_str()))
            .collect();
        println!(
            "    {:<8} {:>3} x {:<24} {:>9}  {}",
            item.id,
            item.quantity,
            truncate(&item.name, 24),
            money(item.line_total()),
            if assigned.is_empty() {
                "⚠️  unassigned".to_string()
            } else {
                assigned.join(", ")
            }
        );
    }

    println!("{}", "─".repeat(70));
    println!(
        "  Subtotal {}  Tax {} ({})  Tip {} ({})  Total {}",
        money(receipt.subtotal),
        money(receipt.tax),
        receipt.tax_distribution,
        money(receipt.tip),
        receipt.tip_distribution,
        money(receipt.total)
    );

    let unassigned = unassigned_items(receipt);
    if receipt.is_complete {
        println!(
            "  ✓ Finalized (your share {})",
            money(receipt.finalized_share.unwrap_or_default())
        );
    } else if unassigned.is_empty() && !receipt.items.is_empty() {
        println!("  ✅ All items assigned. Run 'tabsplit finalize {}'", receipt.id);
    } else {
        println!("  {} item(s) still unassigned", unassigned.len());
    }
    println!();
}
