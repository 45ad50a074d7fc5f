//! Receipt extraction command

use anyhow::{anyhow, Context, Result};
use tabsplit_core::config::Config;
use tabsplit_core::db::Database;
use tabsplit_core::extract::{ExtractionOrchestrator, ExtractionOutcome};
use tabsplit_core::models::{ExtractedReceipt, ImageLocator, Receipt};
use tracing::info;

use super::money;

/// Extract `bucket/key` using collaborators from the environment
pub async fn cmd_extract(
    db: &Database,
    config: &Config,
    user: &str,
    bucket: &str,
    key: &str,
    dry_run: bool,
) -> Result<()> {
    let orchestrator = ExtractionOrchestrator::from_env(&config.extraction)
        .context("Failed to configure extraction backends")?;

    if orchestrator.ai().is_none() {
        println!("   💡 Tip: Set OLLAMA_HOST for structured LLM parsing");
    }

    extract_receipt(
        db,
        config,
        &orchestrator,
        user,
        &ImageLocator::new(bucket, key),
        dry_run,
    )
    .await?;
    Ok(())
}

/// Run one extraction job and save the result as a new receipt
///
/// Returns the new receipt id, or `None` for a dry run.
pub async fn extract_receipt(
    db: &Database,
    config: &Config,
    orchestrator: &ExtractionOrchestrator,
    user: &str,
    locator: &ImageLocator,
    dry_run: bool,
) -> Result<Option<i64>> {
    println!("🧾 Extracting {}...", locator);

    let (job, outcome) = orchestrator.run_job(db, locator).await?;

    let extracted = match outcome {
        ExtractionOutcome::Structured(receipt) => {
            println!("   🤖 Parsed by LLM (confidence {:.0})", receipt.confidence);
            receipt
        }
        ExtractionOutcome::Fallback { receipt, reason } => {
            println!("   ⚠️  LLM unavailable ({}), used line patterns", reason);
            println!("      Confidence {:.0}; please review the items", receipt.confidence);
            receipt
        }
        ExtractionOutcome::Failed(err) => {
            return Err(anyhow!(err)).with_context(|| {
                format!("Extraction failed for {} (job #{})", locator, job.id)
            });
        }
    };

    print_extracted(&extracted);

    if dry_run {
        println!();
        println!("Dry run: receipt not saved");
        return Ok(None);
    }

    let mut receipt = Receipt::from_extracted(user, &extracted, &config.receipts.owner_name);
    receipt.set_distribution(
        Some(config.receipts.tax_distribution),
        Some(config.receipts.tip_distribution),
    )?;

    let id = db.create_receipt(&receipt).context("Failed to save receipt")?;
    db.link_extraction_receipt(job.id, id)?;
    info!(receipt = id, job = job.id, "Receipt saved from extraction");

    println!();
    println!("✅ Saved as receipt #{}", id);
    println!("   Next: tabsplit people add {} <name>", id);
    Ok(Some(id))
}

fn print_extracted(receipt: &ExtractedReceipt) {
    println!();
    println!(
        "   Restaurant: {}",
        receipt.restaurant_name.as_deref().unwrap_or("Unknown")
    );
    println!("   Date:       {}", receipt.date.as_deref().unwrap_or("Unknown"));
    for item in &receipt.items {
        println!(
            "     {:>3} x {:<28} {:>9}",
            item.quantity,
            super::truncate(&item.name, 28),
            money(item.line_total())
        );
    }
    println!("   Subtotal:   {}", money(receipt.subtotal));
    println!("   Tax:        {}", money(receipt.tax));
    if receipt.tip > 0.0 {
        println!("   Tip:        {}", money(receipt.tip));
    }
    println!("   Total:      {}", money(receipt.total));
}
