//! People on a receipt

use anyhow::Result;
use tabsplit_core::db::Database;

use super::edit_receipt;

pub fn cmd_people_add(
    db: &Database,
    user: &str,
    receipt_id: i64,
    name: &str,
    email: Option<String>,
    registered: bool,
) -> Result<()> {
    let (_, person_id) = edit_receipt(db, user, receipt_id, |r| {
        r.add_person(name, email, registered)
    })?;
    println!("👤 Added {} as {}", name.trim(), person_id);
    Ok(())
}

pub fn cmd_people_remove(
    db: &Database,
    user: &str,
    receipt_id: i64,
    person_id: &str,
) -> Result<()> {
    let (receipt, _) = edit_receipt(db, user, receipt_id, |r| r.remove_person(person_id))?;
    println!(
        "👋 Removed {}; {} people remain on receipt #{}",
        person_id,
        receipt.people.len(),
        receipt.id
    );
    Ok(())
}
