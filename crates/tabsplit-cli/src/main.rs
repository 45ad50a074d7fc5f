//! Tabsplit CLI - Receipt extraction and bill splitting
//!
//! Usage:
//!   tabsplit init                                Initialize database
//!   tabsplit extract --bucket B --key K          Extract a receipt image
//!   tabsplit assign 1 item-1 person-1 person-2   Share an item
//!   tabsplit finalize 1                          Commit your share

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Health => commands::cmd_health().await,
        Commands::Extract {
            bucket,
            key,
            dry_run,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config()?;
            commands::cmd_extract(&db, &config, &cli.user, &bucket, &key, dry_run).await
        }
        Commands::Receipts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(ReceiptsAction::List) => commands::cmd_receipts_list(&db, &cli.user),
                Some(ReceiptsAction::Show { id }) => {
                    commands::cmd_receipts_show(&db, &cli.user, id)
                }
                Some(ReceiptsAction::Delete { id }) => {
                    commands::cmd_receipts_delete(&db, &cli.user, id)
                }
            }
        }
        Commands::People { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                PeopleAction::Add {
                    receipt,
                    name,
                    email,
                    registered,
                } => commands::cmd_people_add(&db, &cli.user, receipt, &name, email, registered),
                PeopleAction::Remove { receipt, person } => {
                    commands::cmd_people_remove(&db, &cli.user, receipt, &person)
                }
            }
        }
        Commands::Items { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                ItemsAction::Add {
                    receipt,
                    name,
                    price,
                    quantity,
                } => commands::cmd_items_add(&db, &cli.user, receipt, &name, quantity, price),
                ItemsAction::Remove { receipt, item } => {
                    commands::cmd_items_remove(&db, &cli.user, receipt, &item)
                }
            }
        }
        Commands::Assign {
            receipt,
            item,
            people,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_assign(&db, &cli.user, receipt, &item, &people)
        }
        Commands::Unassign { receipt, item } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_unassign(&db, &cli.user, receipt, &item)
        }
        Commands::Toggle {
            receipt,
            item,
            person,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_toggle(&db, &cli.user, receipt, &item, &person)
        }
        Commands::Distribution { receipt, tax, tip } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_distribution(&db, &cli.user, receipt, tax.as_deref(), tip.as_deref())
        }
        Commands::Split { receipt, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_split(&db, &cli.user, receipt, json)
        }
        Commands::Summary { receipt } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, &cli.user, receipt)
        }
        Commands::Finalize { receipt, amount } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_finalize(&db, &cli.user, receipt, amount).map(|_| ())
        }
        Commands::Restaurants => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_restaurants(&db, &cli.user)
        }
        Commands::Jobs { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_jobs(&db, limit)
        }
    }
}
