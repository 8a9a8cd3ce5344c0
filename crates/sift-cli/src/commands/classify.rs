//! Bulk classification command implementations

use anyhow::Result;
use sift_core::config::{CardHolderMap, CardHolderProvider};
use sift_core::db::Database;
use sift_core::models::BulkTagResult;
use sift_core::{Classifier, ClassifyScope};

use super::{parse_date_arg, print_json};
use crate::cli::ScopeArgs;

/// Turn --account/--from/--to flags into a classification scope
pub fn resolve_scope(args: &ScopeArgs) -> Result<ClassifyScope> {
    let from = parse_date_arg("--from", args.from.as_deref())?;
    let to = parse_date_arg("--to", args.to.as_deref())?;

    let mut scope = ClassifyScope::all().between(from, to);
    if let Some(account_id) = args.account {
        scope = scope.account(account_id);
    }
    Ok(scope)
}

fn print_bulk_result(label: &str, result: &BulkTagResult) {
    println!("✅ {}", label);
    println!("   Matched:     {}", result.matched);
    println!("   Newly tagged: {}", result.tagged);
    if result.matched > 0 && result.tagged == 0 {
        println!("   \x1b[2m(all matches were already tagged)\x1b[0m");
    }
}

pub fn cmd_classify_merchant(
    db: &Database,
    holders: &CardHolderMap,
    scope: ClassifyScope,
    pattern: &str,
    tags: &[String],
    json: bool,
) -> Result<()> {
    let classifier = Classifier::new(db, holders).with_scope(scope);
    let result = classifier.bulk_by_merchant(pattern, tags)?;

    if json {
        return print_json(&result);
    }

    print_bulk_result(
        &format!("Merchant '{}' → {}", pattern, tags.join(", ")),
        &result,
    );
    Ok(())
}

pub fn cmd_classify_category(
    db: &Database,
    holders: &CardHolderMap,
    scope: ClassifyScope,
    category: &str,
    tags: &[String],
    json: bool,
) -> Result<()> {
    let classifier = Classifier::new(db, holders).with_scope(scope);
    let result = classifier.bulk_by_category(category, tags)?;

    if json {
        return print_json(&result);
    }

    print_bulk_result(
        &format!("Category '{}' → {}", category, tags.join(", ")),
        &result,
    );
    Ok(())
}

pub fn cmd_classify_card(
    db: &Database,
    holders: &CardHolderMap,
    scope: ClassifyScope,
    suffix: &str,
    holder: &str,
    json: bool,
) -> Result<()> {
    let classifier = Classifier::new(db, holders).with_scope(scope);
    let result = classifier.bulk_by_card(suffix, holder)?;

    if json {
        return print_json(&result);
    }

    print_bulk_result(&format!("Card *{} → {}", suffix.trim(), holder), &result);
    Ok(())
}

pub fn cmd_classify_holders(
    db: &Database,
    holders: &CardHolderMap,
    scope: ClassifyScope,
    json: bool,
) -> Result<()> {
    if holders.is_empty() && !json {
        println!("No card holders configured. Add a [card_holders] section to your config.");
        return Ok(());
    }

    let classifier = Classifier::new(db, holders).with_scope(scope);
    let applied = classifier.apply_card_holders()?;

    if json {
        return print_json(&applied);
    }

    println!();
    println!("💳 Card Holders");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:6} │ {:20} │ {:>8} │ {:>8}", "Card", "Holder", "Matched", "Tagged");
    println!("   ───────┼──────────────────────┼──────────┼─────────");
    for entry in &applied {
        println!(
            "   *{:5} │ {:20} │ {:>8} │ {:>8}",
            entry.card_suffix,
            super::truncate(&entry.holder, 20),
            entry.result.matched,
            entry.result.tagged
        );
    }

    let total: usize = applied.iter().map(|e| e.result.tagged).sum();
    println!();
    println!(
        "✅ {} transactions tagged across {} cards",
        total,
        holders.mappings().len()
    );
    Ok(())
}

pub fn cmd_classify_migrate(
    db: &Database,
    holders: &CardHolderMap,
    scope: ClassifyScope,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let classifier = Classifier::new(db, holders).with_scope(scope);
    let migration = classifier.migrate_categories(dry_run)?;

    if json {
        return print_json(&migration);
    }

    if migration.categories.is_empty() {
        println!("No categorized transactions to migrate.");
        return Ok(());
    }

    println!();
    if dry_run {
        println!("🔍 Category Migration (dry run, nothing written)");
    } else {
        println!("🏷️  Category Migration");
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:30} │ {:>8}", "Category", "Tagged");
    println!("   ───────────────────────────────┼─────────");
    for (category, count) in &migration.categories {
        let line = format!("   {:30} │ {:>8}", super::truncate(category, 30), count);
        if *count == 0 {
            println!("\x1b[2m{}\x1b[0m", line);
        } else {
            println!("{}", line);
        }
    }
    println!();

    let verb = if dry_run { "would be tagged" } else { "tagged" };
    println!(
        "✅ {} transactions {} from {} categories",
        migration.total(),
        verb,
        migration.categories.len()
    );
    Ok(())
}
