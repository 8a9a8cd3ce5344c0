//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::process::ExitCode;

use chrono::NaiveDate;
use sift_core::config::CardHolderMap;
use sift_core::db::Database;
use sift_core::models::{Credentials, Institution, NewTransaction};
use sift_core::ClassifyScope;

use crate::cli::ScopeArgs;
use crate::commands::{self, format_amount, truncate};

fn setup_test_db() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let account_id = db
        .register_account(
            "Test Card",
            Institution::Max,
            &Credentials::UsernamePassword {
                username: "tester".to_string(),
                password: "secret".to_string(),
            },
        )
        .unwrap();
    (db, account_id)
}

/// Insert a transaction and return its id
fn create_test_transaction(
    db: &Database,
    account_id: i64,
    date: &str,
    description: &str,
    amount: f64,
    category: Option<&str>,
    card: Option<&str>,
) -> i64 {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    let mut tx = NewTransaction::new(date, description, amount);
    tx.category = category.map(String::from);
    tx.card_suffix = card.map(String::from);
    db.insert_transaction(account_id, &tx).unwrap().unwrap()
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long description here", 10), "a long ...");
    // Multi-byte characters count as one
    assert_eq!(truncate("שופרסל דיל", 10), "שופרסל דיל");
    assert_eq!(truncate("שופרסל דיל חולון", 8), "שופרס...");
}

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0.00");
    assert_eq!(format_amount(12.5), "12.50");
    assert_eq!(format_amount(-1234.5), "-1,234.50");
    assert_eq!(format_amount(1234567.891), "1,234,567.89");
    assert_eq!(format_amount(-0.001), "0.00");
}

#[test]
fn test_resolve_period_named() {
    let today = d("2024-03-15");

    let (from, to) = commands::resolve_period_from("this-month", today).unwrap();
    assert_eq!((from, to), (d("2024-03-01"), today));

    let (from, to) = commands::resolve_period_from("last-month", today).unwrap();
    assert_eq!((from, to), (d("2024-02-01"), d("2024-02-29")));

    let (from, to) = commands::resolve_period_from("this-year", today).unwrap();
    assert_eq!((from, to), (d("2024-01-01"), today));

    let (from, _) = commands::resolve_period_from("last-30-days", today).unwrap();
    assert_eq!(from, d("2024-02-14"));

    let (from, _) = commands::resolve_period_from("last-12-months", today).unwrap();
    assert_eq!(from, d("2023-04-01"));
}

#[test]
fn test_resolve_period_january_wraps_year() {
    let today = d("2024-01-10");
    let (from, to) = commands::resolve_period_from("last-month", today).unwrap();
    assert_eq!((from, to), (d("2023-12-01"), d("2023-12-31")));
}

#[test]
fn test_resolve_period_custom_and_unknown() {
    let (from, to) =
        commands::resolve_period("ignored", Some("2024-01-01"), Some("2024-01-31")).unwrap();
    assert_eq!((from, to), (d("2024-01-01"), d("2024-01-31")));

    assert!(commands::resolve_period("this-month", Some("01/01/2024"), Some("2024-01-31")).is_err());
    assert!(commands::resolve_period("fortnight", None, None).is_err());
}

#[test]
fn test_parse_month_arg() {
    let month = commands::parse_month_arg("2024-02").unwrap();
    assert_eq!((month.year, month.month), (2024, 2));
    assert!(commands::parse_month_arg("2024-13").is_err());
    assert!(commands::parse_month_arg("February").is_err());
}

#[test]
fn test_resolve_scope() {
    let args = ScopeArgs {
        account: Some(7),
        from: Some("2024-01-01".to_string()),
        to: None,
    };
    let scope = commands::resolve_scope(&args).unwrap();
    assert_eq!(scope.account_id, Some(7));
    assert_eq!(scope.from, Some(d("2024-01-01")));
    assert_eq!(scope.to, None);

    let bad = ScopeArgs {
        account: None,
        from: Some("yesterday".to_string()),
        to: None,
    };
    assert!(commands::resolve_scope(&bad).is_err());
}

#[test]
fn test_build_credentials_matches_institution() {
    let creds = commands::build_credentials(
        "leumi",
        Some("dana".to_string()),
        Some("pw".to_string()),
        None,
        None,
    )
    .unwrap();
    assert!(matches!(creds, Credentials::UsernamePassword { .. }));

    // Hapoalim wants a user id and label
    let result = commands::build_credentials(
        "hapoalim",
        Some("dana".to_string()),
        Some("pw".to_string()),
        None,
        None,
    );
    assert!(result.is_err());

    assert!(commands::build_credentials("mybank", None, None, None, None).is_err());
}

// ========== Exit Codes ==========

#[test]
fn test_exit_codes() {
    let (db, account_id) = setup_test_db();
    let tx = create_test_transaction(&db, account_id, "2024-01-05", "SHOP", -10.0, None, None);

    let not_found = commands::cmd_tags_delete(&db, "missing").unwrap_err();
    assert_eq!(commands::exit_code_for(&not_found), ExitCode::from(3));

    let validation = commands::cmd_tag(&db, tx, &["  ".to_string()]).unwrap_err();
    assert_eq!(commands::exit_code_for(&validation), ExitCode::from(2));

    let other = anyhow::anyhow!("something else");
    assert_eq!(commands::exit_code_for(&other), ExitCode::FAILURE);
}

#[test]
fn test_missing_config_is_not_found() {
    let err = commands::load_config(Some(std::path::Path::new("/nonexistent/sift.toml"))).unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(3));
}

// ========== Accounts Command Tests ==========

#[test]
fn test_cmd_accounts() {
    let (db, _) = setup_test_db();
    let creds = Credentials::UserIdLabel {
        user_id: "012345678".to_string(),
        label: "home".to_string(),
    };
    commands::cmd_accounts_add(&db, "Checking", "discount", &creds).unwrap();
    assert_eq!(db.list_accounts().unwrap().len(), 2);

    assert!(commands::cmd_accounts_list(&db, false).is_ok());
    assert!(commands::cmd_accounts_list(&db, true).is_ok());
}

// ========== Tags Command Tests ==========

#[test]
fn test_cmd_tag_and_untag() {
    let (db, account_id) = setup_test_db();
    let tx = create_test_transaction(&db, account_id, "2024-01-05", "WOLT", -50.0, None, None);

    commands::cmd_tag(&db, tx, &["Food".to_string(), "Delivery".to_string()]).unwrap();
    let tags = db.tags_for(tx).unwrap();
    assert!(tags.contains("Food"));
    assert!(tags.contains("Delivery"));

    commands::cmd_untag(&db, tx, &["food".to_string()]).unwrap();
    let tags = db.tags_for(tx).unwrap();
    assert_eq!(tags.len(), 1);
    assert!(tags.contains("Delivery"));
}

#[test]
fn test_cmd_tag_missing_transaction() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_tag(&db, 999, &["Food".to_string()]).is_err());
}

#[test]
fn test_cmd_tags_list_and_stats() {
    let (db, account_id) = setup_test_db();
    assert!(commands::cmd_tags_list(&db, false).is_ok());

    let tx = create_test_transaction(&db, account_id, "2024-01-05", "WOLT", -50.0, None, None);
    commands::cmd_tag(&db, tx, &["Food".to_string()]).unwrap();

    assert!(commands::cmd_tags_list(&db, false).is_ok());
    assert!(commands::cmd_tags_list(&db, true).is_ok());
    assert!(commands::cmd_tags_stats(&db, false).is_ok());
    assert!(commands::cmd_tags_stats(&db, true).is_ok());
}

#[test]
fn test_cmd_tags_rename_merges() {
    let (db, account_id) = setup_test_db();
    let a = create_test_transaction(&db, account_id, "2024-01-05", "A", -1.0, None, None);
    let b = create_test_transaction(&db, account_id, "2024-01-06", "B", -2.0, None, None);
    commands::cmd_tag(&db, a, &["Eating Out".to_string()]).unwrap();
    commands::cmd_tag(&db, b, &["Restaurants".to_string()]).unwrap();

    commands::cmd_tags_rename(&db, "Eating Out", "Restaurants", false).unwrap();

    assert!(db.find_tag("Eating Out").unwrap().is_none());
    assert_eq!(db.transaction_ids_with_tag("Restaurants").unwrap().len(), 2);
}

#[test]
fn test_cmd_tags_delete() {
    let (db, account_id) = setup_test_db();
    let tx = create_test_transaction(&db, account_id, "2024-01-05", "A", -1.0, None, None);
    commands::cmd_tag(&db, tx, &["Temp".to_string()]).unwrap();

    commands::cmd_tags_delete(&db, "temp").unwrap();
    assert!(db.find_tag("Temp").unwrap().is_none());
    assert!(db.tags_for(tx).unwrap().is_empty());
}

#[test]
fn test_cmd_categorize_sets_and_clears_override() {
    let (db, account_id) = setup_test_db();
    let tx = create_test_transaction(
        &db,
        account_id,
        "2024-01-05",
        "SUPER-PHARM",
        -80.0,
        Some("Shopping"),
        None,
    );

    commands::cmd_categorize(&db, tx, Some("Health")).unwrap();
    let conn = db.conn().unwrap();
    let user_category: Option<String> = conn
        .query_row(
            "SELECT user_category FROM transactions WHERE id = ?1",
            rusqlite::params![tx],
            |row| row.get(0),
        )
        .unwrap();
    drop(conn);
    assert_eq!(user_category.as_deref(), Some("Health"));

    commands::cmd_categorize(&db, tx, None).unwrap();
    let stored = db.get_transaction(tx).unwrap().unwrap();
    assert_eq!(stored.user_category, None);
    assert_eq!(stored.effective_category(), Some("Shopping"));
}

// ========== Classify Command Tests ==========

#[test]
fn test_cmd_classify_merchant_and_category() {
    let (db, account_id) = setup_test_db();
    let holders = CardHolderMap::new();
    let wolt = create_test_transaction(&db, account_id, "2024-01-05", "WOLT TLV", -50.0, Some("Food"), None);
    let rami = create_test_transaction(&db, account_id, "2024-01-06", "RAMI LEVY", -200.0, Some("Groceries"), None);

    commands::cmd_classify_merchant(
        &db,
        &holders,
        ClassifyScope::all(),
        "wolt",
        &["Delivery".to_string()],
        false,
    )
    .unwrap();
    assert!(db.tags_for(wolt).unwrap().contains("Delivery"));
    assert!(db.tags_for(rami).unwrap().is_empty());

    commands::cmd_classify_category(
        &db,
        &holders,
        ClassifyScope::all(),
        "Groceries",
        &["Home".to_string()],
        true,
    )
    .unwrap();
    assert!(db.tags_for(rami).unwrap().contains("Home"));
}

#[test]
fn test_cmd_classify_merchant_empty_pattern_is_validation() {
    let (db, _) = setup_test_db();
    let holders = CardHolderMap::new();
    let err = commands::cmd_classify_merchant(
        &db,
        &holders,
        ClassifyScope::all(),
        "  ",
        &["X".to_string()],
        false,
    )
    .unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(2));
}

#[test]
fn test_cmd_classify_card_and_holders() {
    let (db, account_id) = setup_test_db();
    let mut holders = CardHolderMap::new();
    holders.insert("1234", "Dana").unwrap();
    holders.insert("5678", "Yoni").unwrap();

    let a = create_test_transaction(&db, account_id, "2024-01-05", "A", -10.0, None, Some("1234"));
    let b = create_test_transaction(&db, account_id, "2024-01-06", "B", -20.0, None, Some("5678"));

    commands::cmd_classify_holders(&db, &holders, ClassifyScope::all(), false).unwrap();
    assert!(db.tags_for(a).unwrap().contains("Dana"));
    assert!(db.tags_for(b).unwrap().contains("Yoni"));

    let err = commands::cmd_classify_card(&db, &holders, ClassifyScope::all(), "12", "X", false)
        .unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(2));
}

#[test]
fn test_cmd_classify_migrate_dry_run_writes_nothing() {
    let (db, account_id) = setup_test_db();
    let holders = CardHolderMap::new();
    create_test_transaction(&db, account_id, "2024-01-05", "A", -10.0, Some("Food"), None);

    commands::cmd_classify_migrate(&db, &holders, ClassifyScope::all(), true, false).unwrap();
    assert!(db.list_tags().unwrap().is_empty());

    commands::cmd_classify_migrate(&db, &holders, ClassifyScope::all(), false, false).unwrap();
    assert!(db.find_tag("Food").unwrap().is_some());
}

// ========== Report Command Tests ==========

#[test]
fn test_report_commands_on_empty_db() {
    let (db, _) = setup_test_db();
    let holders = CardHolderMap::new();

    assert!(commands::cmd_report_breakdown(&db, d("2024-01-01"), d("2024-01-31"), false).is_ok());
    assert!(commands::cmd_report_monthly(&db, Some("2024-02"), false).is_ok());
    assert!(commands::cmd_report_monthly(&db, None, false).is_ok());
    assert!(commands::cmd_report_trends(&db, 6, None, None, false).is_ok());
    assert!(commands::cmd_report_categories(&db, 6, 5, false).is_ok());
    assert!(commands::cmd_report_cards(&db, &holders, 6, false).is_ok());
    assert!(commands::cmd_insights(&db, 6, 5, false).is_ok());
}

#[test]
fn test_report_commands_with_data() {
    let (db, account_id) = setup_test_db();
    let mut holders = CardHolderMap::new();
    holders.insert("1234", "Dana").unwrap();

    create_test_transaction(&db, account_id, "2024-01-10", "RAMI LEVY", -100.0, Some("Groceries"), Some("1234"));
    create_test_transaction(&db, account_id, "2024-02-10", "RAMI LEVY", -150.0, Some("Groceries"), Some("1234"));
    let wolt = create_test_transaction(&db, account_id, "2024-02-12", "WOLT", -60.0, Some("Food"), Some("9999"));
    commands::cmd_tag(&db, wolt, &["Delivery".to_string()]).unwrap();

    for json in [false, true] {
        commands::cmd_report_breakdown(&db, d("2024-01-01"), d("2024-02-29"), json).unwrap();
        commands::cmd_report_monthly(&db, None, json).unwrap();
        commands::cmd_report_trends(&db, 3, Some("Delivery"), None, json).unwrap();
        commands::cmd_report_trends(&db, 3, None, Some("1234"), json).unwrap();
        commands::cmd_report_categories(&db, 2, 2, json).unwrap();
        commands::cmd_report_cards(&db, &holders, 2, json).unwrap();
        commands::cmd_report_tag(&db, "Delivery", None, None, json).unwrap();
        commands::cmd_insights(&db, 2, 5, json).unwrap();
    }
}

#[test]
fn test_report_errors() {
    let (db, _) = setup_test_db();

    let err = commands::cmd_report_tag(&db, "nope", None, None, false).unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(3));

    let err = commands::cmd_report_breakdown(&db, d("2024-02-01"), d("2024-01-01"), false).unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(2));

    let err = commands::cmd_report_trends(&db, 0, None, None, false).unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(2));

    let err = commands::cmd_report_trends(&db, 3, None, Some("12ab"), false).unwrap_err();
    assert_eq!(commands::exit_code_for(&err), ExitCode::from(2));
}
