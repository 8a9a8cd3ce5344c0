//! Tag command implementations

use anyhow::Result;
use sift_core::db::Database;
use sift_core::models::RenameOutcome;

use super::{format_amount, print_json, truncate};

pub fn cmd_tags_list(db: &Database, json: bool) -> Result<()> {
    let tags = db.list_tags()?;

    if json {
        return print_json(&tags);
    }

    if tags.is_empty() {
        println!("No tags yet. Tag a transaction with 'sift tag <id> <name>'.");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────────────────────────────────────");
    for tag in &tags {
        println!("   • {}", tag.name);
    }

    Ok(())
}

pub fn cmd_tags_stats(db: &Database, json: bool) -> Result<()> {
    let stats = db.tag_stats()?;

    if json {
        return print_json(&stats);
    }

    println!();
    println!("🏷️  Tag Usage");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {:>6} │ {:>12}", "Tag", "Count", "Total");
    println!("   ──────────────────────────┼────────┼─────────────");
    for tag in &stats.tags {
        println!(
            "   {:25} │ {:>6} │ {:>12}",
            truncate(&tag.name, 25),
            tag.transaction_count,
            format_amount(tag.total)
        );
    }
    println!(
        "   {:25} │ {:>6} │ {:>12}",
        "\x1b[2mUntagged\x1b[0m",
        stats.untagged_count,
        format_amount(stats.untagged_total)
    );

    Ok(())
}

pub fn cmd_tags_rename(db: &Database, old_name: &str, new_name: &str, json: bool) -> Result<()> {
    let outcome = db.rename_tag(old_name, new_name)?;

    if json {
        return print_json(&outcome);
    }

    match outcome {
        RenameOutcome::Renamed { .. } => {
            println!("✅ Renamed '{}' to '{}'", old_name, new_name);
        }
        RenameOutcome::Merged { moved, skipped, .. } => {
            println!(
                "✅ Merged '{}' into '{}' ({} assignments moved, {} already present)",
                old_name, new_name, moved, skipped
            );
        }
    }

    Ok(())
}

pub fn cmd_tags_delete(db: &Database, tag_name: &str) -> Result<()> {
    let removed = db.delete_tag(tag_name)?;
    println!(
        "✅ Deleted tag '{}' ({} transactions untagged)",
        tag_name, removed
    );
    Ok(())
}

pub fn cmd_tag(db: &Database, transaction_id: i64, tags: &[String]) -> Result<()> {
    let created = db.assign_tags(transaction_id, tags)?;
    let current = db.tags_for(transaction_id)?;

    println!(
        "✅ Transaction {}: {} tag(s) added, now tagged {}",
        transaction_id,
        created,
        current.into_iter().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

pub fn cmd_untag(db: &Database, transaction_id: i64, tags: &[String]) -> Result<()> {
    let removed = db.unassign_tags(transaction_id, tags)?;
    println!(
        "✅ Transaction {}: {} tag(s) removed",
        transaction_id, removed
    );
    Ok(())
}

pub fn cmd_categorize(db: &Database, transaction_id: i64, category: Option<&str>) -> Result<()> {
    db.set_user_category(transaction_id, category)?;
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => println!("✅ Transaction {} categorized as '{}'", transaction_id, c),
        None => println!("✅ Transaction {} category override cleared", transaction_id),
    }
    Ok(())
}
