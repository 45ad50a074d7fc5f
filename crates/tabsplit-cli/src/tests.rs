//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use tabsplit_core::ai::AIClient;
use tabsplit_core::config::Config;
use tabsplit_core::db::Database;
use tabsplit_core::extract::ExtractionOrchestrator;
use tabsplit_core::models::{
    DistributionMode, ExtractedItem, ExtractedReceipt, ExtractionSource, FinalizeOutcome,
    ImageLocator, Receipt,
};
use tabsplit_core::ocr::{HttpOcrBackend, OcrClient};
use tabsplit_core::test_utils::{MockAiServer, MockOcrServer, SAMPLE_BUCKET, SAMPLE_KEY};

use crate::commands::{self, money, truncate};

const USER: &str = "local";

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Save a two-item receipt for `USER`, returning its id
fn create_test_receipt(db: &Database) -> i64 {
    let extracted = ExtractedReceipt {
        restaurant_name: Some("Joe's Diner".into()),
        restaurant_address: None,
        date: Some("2024-01-15".into()),
        items: vec![
            ExtractedItem {
                name: "Burger".into(),
                quantity: 1,
                price: 12.0,
            },
            ExtractedItem {
                name: "Fries".into(),
                quantity: 1,
                price: 4.0,
            },
        ],
        subtotal: 16.0,
        tax: 0.0,
        tip: 4.0,
        total: 20.0,
        confidence: 90.0,
        extraction_source: ExtractionSource::Llm,
    };
    db.create_receipt(&Receipt::from_extracted(USER, &extracted, "Me"))
        .unwrap()
}

fn load(db: &Database, id: i64) -> Receipt {
    db.get_receipt(id).unwrap().unwrap()
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer name", 10), "a much ...");
    assert_eq!(truncate("Café Müller Gasthaus", 8), "Café ...");
}

#[test]
fn test_money() {
    assert_eq!(money(6.0), "$6.00");
    assert_eq!(money(18.704), "$18.70");
}

// ========== Receipt Command Tests ==========

#[test]
fn test_cmd_receipts_list_empty_and_populated() {
    let db = setup_test_db();
    assert!(commands::cmd_receipts_list(&db, USER).is_ok());

    create_test_receipt(&db);
    assert!(commands::cmd_receipts_list(&db, USER).is_ok());
}

#[test]
fn test_cmd_receipts_show_other_user() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);

    assert!(commands::cmd_receipts_show(&db, USER, id).is_ok());
    assert!(commands::cmd_receipts_show(&db, "someone-else", id).is_err());
}

#[test]
fn test_cmd_items_add_and_remove() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);

    commands::cmd_items_add(&db, USER, id, "Shake", 2, 5.0).unwrap();
    let r = load(&db, id);
    assert_eq!(r.items.len(), 3);
    assert_eq!(r.items[2].id, "item-3");
    assert_eq!(r.subtotal, 26.0);
    assert_eq!(r.version, 2);

    commands::cmd_items_remove(&db, USER, id, "item-3").unwrap();
    let r = load(&db, id);
    assert_eq!(r.items.len(), 2);
    assert_eq!(r.subtotal, 16.0);

    assert!(commands::cmd_items_add(&db, USER, id, "", 1, 1.0).is_err());
    assert!(commands::cmd_items_add(&db, USER, id, "Refund", 1, -3.0).is_err());
    // Failed edits are not saved
    assert_eq!(load(&db, id).version, 3);
}

// ========== People & Assignment Tests ==========

#[test]
fn test_cmd_people_add_and_remove() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);

    commands::cmd_people_add(&db, USER, id, "Alice", Some("alice@example.com".into()), true)
        .unwrap();
    let r = load(&db, id);
    assert_eq!(r.people.len(), 2);
    assert_eq!(r.people[1].id, "person-2");
    assert!(r.people[1].is_registered_user);

    commands::cmd_assign(&db, USER, id, "item-1", &["person-2".to_string()]).unwrap();
    commands::cmd_people_remove(&db, USER, id, "person-2").unwrap();

    let r = load(&db, id);
    assert_eq!(r.people.len(), 1);
    assert!(r.items[0].assigned_to.is_empty());

    // The owner stays
    assert!(commands::cmd_people_remove(&db, USER, id, "person-1").is_err());
}

#[test]
fn test_cmd_assign_unassign_toggle() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    commands::cmd_people_add(&db, USER, id, "Alice", None, false).unwrap();

    commands::cmd_assign(
        &db,
        USER,
        id,
        "item-1",
        &["person-1".to_string(), "person-2".to_string()],
    )
    .unwrap();
    let r = load(&db, id);
    assert_eq!(r.split_calculations[0].subtotal, 6.0);
    assert_eq!(r.split_calculations[1].subtotal, 6.0);

    commands::cmd_toggle(&db, USER, id, "item-1", "person-2").unwrap();
    assert_eq!(load(&db, id).items[0].assigned_to, vec!["person-1".to_string()]);

    commands::cmd_unassign(&db, USER, id, "item-1").unwrap();
    assert!(load(&db, id).items[0].assigned_to.is_empty());

    assert!(commands::cmd_assign(&db, USER, id, "item-1", &["person-9".to_string()]).is_err());
    assert!(commands::cmd_assign(&db, USER, id, "item-9", &["person-1".to_string()]).is_err());
}

#[test]
fn test_cmd_distribution() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);

    commands::cmd_distribution(&db, USER, id, None, Some("equal")).unwrap();
    let r = load(&db, id);
    assert_eq!(r.tax_distribution, DistributionMode::Proportional);
    assert_eq!(r.tip_distribution, DistributionMode::Equal);

    assert!(commands::cmd_distribution(&db, USER, id, Some("evenly"), None).is_err());
    assert!(commands::cmd_distribution(&db, USER, id, None, None).is_err());
}

// ========== Split & Ledger Tests ==========

#[test]
fn test_cmd_split_and_summary() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    commands::cmd_assign(&db, USER, id, "item-1", &["person-1".to_string()]).unwrap();

    assert!(commands::cmd_split(&db, USER, id, false).is_ok());
    assert!(commands::cmd_split(&db, USER, id, true).is_ok());
    assert!(commands::cmd_summary(&db, USER, id).is_ok());
    assert!(commands::cmd_split(&db, USER, 999, false).is_err());
}

#[test]
fn test_cmd_finalize_owner_share_once() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    commands::cmd_people_add(&db, USER, id, "Alice", None, false).unwrap();
    commands::cmd_assign(&db, USER, id, "item-1", &["person-1".to_string()]).unwrap();
    commands::cmd_assign(&db, USER, id, "item-2", &["person-2".to_string()]).unwrap();

    // Owner: burger 12 plus 12/16 of the 4.00 tip
    let outcome = commands::cmd_finalize(&db, USER, id, None).unwrap();
    assert_eq!(
        outcome,
        FinalizeOutcome::Applied {
            restaurant: "Joe's Diner".into(),
            amount: 15.0
        }
    );

    let again = commands::cmd_finalize(&db, USER, id, Some(50.0)).unwrap();
    assert_eq!(again, FinalizeOutcome::AlreadyFinalized);

    let agg = db
        .get_restaurant_aggregate(USER, "Joe's Diner")
        .unwrap()
        .unwrap();
    assert_eq!(agg.visit_count, 1);
    assert_eq!(agg.total_spent, 15.0);
    assert!(commands::cmd_restaurants(&db, USER).is_ok());
}

#[test]
fn test_cmd_finalize_rejects_negative_amount() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    assert!(commands::cmd_finalize(&db, USER, id, Some(-1.0)).is_err());
    assert!(!load(&db, id).is_complete);
}

#[test]
fn test_cmd_receipts_delete_reverses_ledger() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    commands::cmd_finalize(&db, USER, id, Some(10.0)).unwrap();

    commands::cmd_receipts_delete(&db, USER, id).unwrap();
    assert!(db.get_receipt(id).unwrap().is_none());
    assert!(db
        .get_restaurant_aggregate(USER, "Joe's Diner")
        .unwrap()
        .is_none());
    assert!(commands::cmd_receipts_delete(&db, USER, id).is_err());
}

#[test]
fn test_edit_after_finalize_keeps_flag() {
    let db = setup_test_db();
    let id = create_test_receipt(&db);
    commands::cmd_finalize(&db, USER, id, Some(10.0)).unwrap();

    commands::cmd_people_add(&db, USER, id, "Late Arrival", None, false).unwrap();
    let r = load(&db, id);
    assert!(r.is_complete);
    assert_eq!(r.finalized_share, Some(10.0));
}

// ========== Extraction Tests ==========

fn orchestrator(ocr: &MockOcrServer, ai: &MockAiServer) -> ExtractionOrchestrator {
    ExtractionOrchestrator::new(
        OcrClient::Http(HttpOcrBackend::new(&ocr.url(), None)),
        Some(AIClient::ollama(&ai.url(), "test-model")),
        &Config::default().extraction,
    )
}

#[tokio::test]
async fn test_extract_receipt_saves_and_links() {
    let ocr = MockOcrServer::start().await;
    let ai = MockAiServer::start().await;
    let db = setup_test_db();
    let mut config = Config::default();
    config.receipts.owner_name = "Sam".into();
    config.receipts.tip_distribution = DistributionMode::Equal;

    let id = commands::extract_receipt(
        &db,
        &config,
        &orchestrator(&ocr, &ai),
        USER,
        &ImageLocator::new(SAMPLE_BUCKET, SAMPLE_KEY),
        false,
    )
    .await
    .unwrap()
    .expect("receipt id");

    let r = load(&db, id);
    assert_eq!(r.restaurant_name.as_deref(), Some("Joe's Diner"));
    assert_eq!(r.people[0].name, "Sam");
    assert_eq!(r.tip_distribution, DistributionMode::Equal);
    assert_eq!(r.items.len(), 2);

    let jobs = db.list_extraction_jobs(10).unwrap();
    assert_eq!(jobs[0].receipt_id, Some(id));
    assert!(commands::cmd_jobs(&db, 10).is_ok());
}

#[tokio::test]
async fn test_extract_receipt_dry_run_and_missing_image() {
    let ocr = MockOcrServer::start().await;
    let ai = MockAiServer::start().await;
    let db = setup_test_db();
    let config = Config::default();
    let orch = orchestrator(&ocr, &ai);

    let dry = commands::extract_receipt(
        &db,
        &config,
        &orch,
        USER,
        &ImageLocator::new(SAMPLE_BUCKET, SAMPLE_KEY),
        true,
    )
    .await
    .unwrap();
    assert!(dry.is_none());
    assert!(db.list_receipts(USER).unwrap().is_empty());

    let missing = commands::extract_receipt(
        &db,
        &config,
        &orch,
        USER,
        &ImageLocator::new(SAMPLE_BUCKET, "missing.jpg"),
        false,
    )
    .await;
    assert!(missing.is_err());
    assert!(db.list_receipts(USER).unwrap().is_empty());
}
