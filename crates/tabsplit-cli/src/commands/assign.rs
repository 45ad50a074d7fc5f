//! Item assignment and tax/tip distribution commands

use anyhow::{anyhow, Result};
use tabsplit_core::completion::progress;
use tabsplit_core::db::Database;
use tabsplit_core::models::{DistributionMode, Receipt};

use super::edit_receipt;

pub fn cmd_assign(
    db: &Database,
    user: &str,
    receipt_id: i64,
    item_id: &str,
    people: &[String],
) -> Result<()> {
    let (receipt, _) = edit_receipt(db, user, receipt_id, |r| r.assign_item(item_id, people))?;
    println!("🔗 {} → {}", item_id, people.join(", "));
    print_progress(&receipt);
    Ok(())
}

pub fn cmd_unassign(db: &Database, user: &str, receipt_id: i64, item_id: &str) -> Result<()> {
    let (receipt, _) = edit_receipt(db, user, receipt_id, |r| r.unassign_item(item_id))?;
    println!("✂️  {} unassigned", item_id);
    print_progress(&receipt);
    Ok(())
}

pub fn cmd_toggle(
    db: &Database,
    user: &str,
    receipt_id: i64,
    item_id: &str,
    person_id: &str,
) -> Result<()> {
    let (receipt, added) = edit_receipt(db, user, receipt_id, |r| {
        r.toggle_assignment(item_id, person_id)
    })?;
    if added {
        println!("🔗 {} now shares {}", person_id, item_id);
    } else {
        println!("✂️  {} no longer shares {}", person_id, item_id);
    }
    print_progress(&receipt);
    Ok(())
}

pub fn cmd_distribution(
    db: &Database,
    user: &str,
    receipt_id: i64,
    tax: Option<&str>,
    tip: Option<&str>,
) -> Result<()> {
    if tax.is_none() && tip.is_none() {
        return Err(anyhow!("Specify --tax and/or --tip (equal or proportional)"));
    }

    let tax: Option<DistributionMode> = tax
        .map(str::parse::<DistributionMode>)
        .transpose()
        .map_err(|e: String| anyhow!(e))?;
    let tip: Option<DistributionMode> = tip
        .map(str::parse::<DistributionMode>)
        .transpose()
        .map_err(|e: String| anyhow!(e))?;

    let (receipt, _) = edit_receipt(db, user, receipt_id, |r| r.set_distribution(tax, tip))?;
    println!(
        "⚖️  Tax: {}, tip: {}",
        receipt.tax_distribution, receipt.tip_distribution
    );
    Ok(())
}

fn print_progress(receipt: &Receipt) {
    let p = progress(receipt);
    if p.total > 0 && p.assigned == p.total {
        println!("   ✅ All {} items assigned", p.total);
    } else {
        println!("   {}/{} items assigned", p.assigned, p.total);
    }
}
