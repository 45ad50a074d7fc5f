//! Finalization and restaurant totals

use anyhow::{Context, Result};
use tabsplit_core::completion::unassigned_items;
use tabsplit_core::db::Database;
use tabsplit_core::ledger::FinalizationLedger;
use tabsplit_core::models::FinalizeOutcome;

use super::{money, truncate};

/// Finalize with an explicit share, or the owner's computed split total
pub fn cmd_finalize(
    db: &Database,
    user: &str,
    receipt_id: i64,
    amount: Option<f64>,
) -> Result<FinalizeOutcome> {
    let receipt = db
        .get_user_receipt(user, receipt_id)
        .with_context(|| format!("Receipt #{} not found", receipt_id))?;

    let unassigned = unassigned_items(&receipt);
    if !receipt.is_complete && !unassigned.is_empty() {
        println!(
            "   ⚠️  {} item(s) unassigned; they are not part of anyone's share",
            unassigned.len()
        );
    }

    let ledger = FinalizationLedger::new(db);
    let outcome = match amount {
        Some(amount) => ledger.finalize(user, receipt_id, amount),
        None => ledger.finalize_owner_share(user, receipt_id),
    }
    .with_context(|| format!("Failed to finalize receipt #{}", receipt_id))?;

    match &outcome {
        FinalizeOutcome::Applied { restaurant, amount } => {
            println!("✅ Finalized #{}: {} at {}", receipt_id, money(*amount), restaurant);
        }
        FinalizeOutcome::AlreadyFinalized => {
            println!("ℹ️  Receipt #{} was already finalized; nothing changed", receipt_id);
        }
    }
    Ok(outcome)
}

pub fn cmd_restaurants(db: &Database, user: &str) -> Result<()> {
    let aggregates = db.list_restaurant_aggregates(user)?;

    if aggregates.is_empty() {
        println!("No finalized receipts yet");
        return Ok(());
    }

    println!("\n🍽️  Restaurants ({})", aggregates.len());
    println!("{}", "─".repeat(70));

    for agg in &aggregates {
        let last = agg
            .last_visit
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<30} {:>4} visit(s) {:>10}  last {}",
            truncate(&agg.name, 30),
            agg.visit_count,
            money(agg.total_spent),
            last
        );
    }

    let total: f64 = aggregates.iter().map(|a| a.total_spent).sum();
    println!("{}", "─".repeat(70));
    println!("  Total spent: {}", money(total));
    println!();
    Ok(())
}
