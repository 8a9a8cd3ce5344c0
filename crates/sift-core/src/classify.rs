//! Bulk classification: tagging many transactions at once
//!
//! Every bulk call selects transactions from its [`ClassifyScope`], filters them
//! in memory and writes all assignments inside one unit of work. Counts mean
//! "transactions that received at least one new assignment", so repeating a
//! call reports 0 and creates nothing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::config::CardHolderProvider;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{validate_card_suffix, BulkTagResult, CategoryMigration, Transaction};

/// Which transactions a bulk operation looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyScope {
    pub account_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ClassifyScope {
    /// Every transaction in the database
    pub fn all() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Restrict to an inclusive date window; either end may be open
    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::Validation(format!(
                    "Invalid date range: {} is after {}",
                    from, to
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of applying one card holder mapping
#[derive(Debug, Clone, Serialize)]
pub struct HolderTagging {
    pub card_suffix: String,
    pub holder: String,
    #[serde(flatten)]
    pub result: BulkTagResult,
}

/// Bulk tagging over the tag store
pub struct Classifier<'a> {
    db: &'a Database,
    holders: &'a dyn CardHolderProvider,
    scope: ClassifyScope,
}

impl<'a> Classifier<'a> {
    /// Create a classifier over every transaction
    pub fn new(db: &'a Database, holders: &'a dyn CardHolderProvider) -> Self {
        Self {
            db,
            holders,
            scope: ClassifyScope::all(),
        }
    }

    /// Restrict subsequent bulk operations to `scope`
    pub fn with_scope(mut self, scope: ClassifyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Tag every transaction whose description contains `pattern`
    ///
    /// Matching lowercases both sides and compares codepoints in stored
    /// (logical) order, so Hebrew and other right-to-left descriptions match
    /// the way they were typed.
    pub fn bulk_by_merchant<S: AsRef<str>>(&self, pattern: &str, tags: &[S]) -> Result<BulkTagResult> {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::Validation("Merchant pattern cannot be empty".to_string()));
        }

        let result = self.tag_matching(tags, |tx| tx.description.to_lowercase().contains(&needle))?;
        info!(
            pattern,
            matched = result.matched,
            tagged = result.tagged,
            "Bulk tagged by merchant"
        );
        Ok(result)
    }

    /// Tag every transaction whose effective category equals `category`
    pub fn bulk_by_category<S: AsRef<str>>(
        &self,
        category: &str,
        tags: &[S],
    ) -> Result<BulkTagResult> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::Validation("Category cannot be empty".to_string()));
        }

        let result = self.tag_matching(tags, |tx| tx.effective_category() == Some(category))?;
        info!(
            category,
            matched = result.matched,
            tagged = result.tagged,
            "Bulk tagged by category"
        );
        Ok(result)
    }

    /// Tag every transaction made with a card as belonging to `holder_name`
    pub fn bulk_by_card(&self, card_suffix: &str, holder_name: &str) -> Result<BulkTagResult> {
        let suffix = validate_card_suffix(card_suffix)?;

        let result = self.tag_matching(&[holder_name], |tx| {
            tx.card_suffix.as_deref() == Some(suffix)
        })?;
        info!(
            card = suffix,
            holder = holder_name,
            matched = result.matched,
            tagged = result.tagged,
            "Bulk tagged by card"
        );
        Ok(result)
    }

    /// Run `bulk_by_card` for every configured card holder
    pub fn apply_card_holders(&self) -> Result<Vec<HolderTagging>> {
        let mut applied = Vec::new();
        for (card_suffix, holder) in self.holders.mappings() {
            let result = self.bulk_by_card(card_suffix, holder)?;
            applied.push(HolderTagging {
                card_suffix: card_suffix.to_string(),
                holder: holder.to_string(),
                result,
            });
        }
        Ok(applied)
    }

    /// Turn every effective category into a tag of the same name
    ///
    /// Returns, per category, how many transactions were newly tagged. With
    /// `dry_run` the same counts are computed and nothing is written.
    /// Uncategorized transactions are left alone.
    pub fn migrate_categories(&self, dry_run: bool) -> Result<CategoryMigration> {
        self.scope.validate()?;

        let categories = if dry_run {
            let conn = self.db.conn()?;
            self.migrate_with_conn(&conn, true)?
        } else {
            self.db.unit_of_work(|conn| self.migrate_with_conn(conn, false))?
        };

        let migration = CategoryMigration {
            dry_run,
            categories,
        };
        info!(
            dry_run,
            categories = migration.categories.len(),
            tagged = migration.total(),
            "Migrated categories to tags"
        );
        Ok(migration)
    }

    fn migrate_with_conn(&self, conn: &Connection, dry_run: bool) -> Result<BTreeMap<String, usize>> {
        let transactions = self.scoped_transactions(conn)?;

        let mut by_category: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for tx in &transactions {
            if let Some(category) = tx.effective_category() {
                by_category.entry(category).or_default().push(tx.id);
            }
        }

        let mut counts = BTreeMap::new();
        for (category, ids) in by_category {
            let newly_tagged = if dry_run {
                match Database::find_tag_with_conn(conn, category)? {
                    Some(tag) => {
                        let mut missing = 0;
                        for id in &ids {
                            if !Database::has_assignment_with_conn(conn, *id, tag.id)? {
                                missing += 1;
                            }
                        }
                        missing
                    }
                    None => ids.len(),
                }
            } else {
                let tag = Database::get_or_create_tag_with_conn(conn, category)?;
                let mut created = 0;
                for id in &ids {
                    if Database::assign_tag_ids_with_conn(conn, *id, &[tag.id])? > 0 {
                        created += 1;
                    }
                }
                created
            };
            counts.insert(category.to_string(), newly_tagged);
        }

        Ok(counts)
    }

    /// Shared bulk path: select, filter, then assign in one unit of work
    fn tag_matching<S, F>(&self, tags: &[S], filter: F) -> Result<BulkTagResult>
    where
        S: AsRef<str>,
        F: Fn(&Transaction) -> bool,
    {
        self.scope.validate()?;
        if tags.is_empty() {
            return Err(Error::Validation("At least one tag is required".to_string()));
        }
        if tags.iter().any(|t| t.as_ref().trim().is_empty()) {
            return Err(Error::Validation("Tag name cannot be empty".to_string()));
        }

        self.db.unit_of_work(|conn| {
            let matching: Vec<Transaction> = self
                .scoped_transactions(conn)?
                .into_iter()
                .filter(|tx| filter(tx))
                .collect();

            let mut result = BulkTagResult {
                matched: matching.len(),
                ..Default::default()
            };
            if matching.is_empty() {
                return Ok(result);
            }

            let mut tag_ids = Vec::with_capacity(tags.len());
            for name in tags {
                tag_ids.push(Database::get_or_create_tag_with_conn(conn, name.as_ref())?.id);
            }

            for tx in &matching {
                let created = Database::assign_tag_ids_with_conn(conn, tx.id, &tag_ids)?;
                if created > 0 {
                    result.tagged += 1;
                    result.assignments_created += created;
                }
            }

            Ok(result)
        })
    }

    fn scoped_transactions(&self, conn: &Connection) -> Result<Vec<Transaction>> {
        Database::transactions_between_with_conn(
            conn,
            self.scope.account_id,
            self.scope.from,
            self.scope.to,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardHolderMap;
    use crate::models::{Credentials, Institution, NewTransaction};

    fn setup() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let account = db
            .register_account(
                "Checking",
                Institution::Leumi,
                &Credentials::UsernamePassword {
                    username: "dana".to_string(),
                    password: "pw".to_string(),
                },
            )
            .unwrap();
        (db, account)
    }

    fn add(
        db: &Database,
        account: i64,
        date: (i32, u32, u32),
        description: &str,
        amount: f64,
        category: Option<&str>,
        card: Option<&str>,
    ) -> i64 {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let mut tx = NewTransaction::new(date, description, amount);
        tx.category = category.map(String::from);
        tx.card_suffix = card.map(String::from);
        db.insert_transaction(account, &tx).unwrap().unwrap()
    }

    #[test]
    fn test_bulk_by_merchant_is_case_insensitive_and_idempotent() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        let a = add(&db, account, (2024, 1, 5), "SHUFERSAL DEAL", -120.0, None, None);
        let b = add(&db, account, (2024, 1, 9), "Shufersal Online", -80.0, None, None);
        add(&db, account, (2024, 1, 9), "PAZ GAS", -200.0, None, None);

        let classifier = Classifier::new(&db, &holders);
        let first = classifier.bulk_by_merchant("shufersal", &["groceries"]).unwrap();
        assert_eq!(first.matched, 2);
        assert_eq!(first.tagged, 2);
        assert_eq!(first.assignments_created, 2);
        assert!(db.tags_for(a).unwrap().contains("groceries"));
        assert!(db.tags_for(b).unwrap().contains("groceries"));

        let rows_before = db.count_assignments().unwrap();
        let second = classifier.bulk_by_merchant("SHUFERSAL", &["Groceries"]).unwrap();
        assert_eq!(second.matched, 2);
        assert_eq!(second.tagged, 0);
        assert_eq!(db.count_assignments().unwrap(), rows_before);
    }

    #[test]
    fn test_bulk_by_merchant_matches_hebrew_in_logical_order() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        let id = add(&db, account, (2024, 2, 1), "סופר פארם רמת גן", -59.9, None, None);
        add(&db, account, (2024, 2, 2), "רמי לוי", -300.0, None, None);

        let classifier = Classifier::new(&db, &holders);
        let result = classifier.bulk_by_merchant("סופר פארם", &["pharmacy"]).unwrap();
        assert_eq!(result.tagged, 1);
        assert!(db.tags_for(id).unwrap().contains("pharmacy"));

        // Visually reversed text is a different codepoint sequence
        let reversed: String = "סופר".chars().rev().collect();
        let result = classifier.bulk_by_merchant(&reversed, &["pharmacy"]).unwrap();
        assert_eq!(result.matched, 0);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let (db, _) = setup();
        let holders = CardHolderMap::new();
        let classifier = Classifier::new(&db, &holders);
        let err = classifier.bulk_by_merchant("   ", &["x"]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_zero_matches_creates_no_tag() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        add(&db, account, (2024, 1, 1), "CAFE", -20.0, None, None);

        let classifier = Classifier::new(&db, &holders);
        let result = classifier.bulk_by_merchant("nothing", &["unused"]).unwrap();
        assert_eq!(result, BulkTagResult::default());
        assert!(db.find_tag("unused").unwrap().is_none());
    }

    #[test]
    fn test_bulk_by_category_uses_effective_category() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        let raw_only = add(&db, account, (2024, 1, 1), "A", -10.0, Some("Food"), None);
        let overridden = add(&db, account, (2024, 1, 2), "B", -10.0, Some("Food"), None);
        db.set_user_category(overridden, Some("Dining")).unwrap();

        let classifier = Classifier::new(&db, &holders);
        let result = classifier.bulk_by_category("Food", &["eat"]).unwrap();
        assert_eq!(result.matched, 1);
        assert!(db.tags_for(raw_only).unwrap().contains("eat"));
        assert!(db.tags_for(overridden).unwrap().is_empty());
    }

    #[test]
    fn test_bulk_by_card_validates_suffix() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        let id = add(&db, account, (2024, 1, 1), "A", -10.0, None, Some("1234"));
        add(&db, account, (2024, 1, 1), "B", -10.0, None, Some("9999"));

        let classifier = Classifier::new(&db, &holders);
        let err = classifier.bulk_by_card("12a4", "Dana").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let result = classifier.bulk_by_card("1234", "Dana").unwrap();
        assert_eq!(result.tagged, 1);
        assert_eq!(
            db.tags_for(id).unwrap().into_iter().collect::<Vec<_>>(),
            vec!["Dana".to_string()]
        );
    }

    #[test]
    fn test_apply_card_holders() {
        let (db, account) = setup();
        let mut holders = CardHolderMap::new();
        holders.insert("1234", "Dana").unwrap();
        holders.insert("5678", "Noam").unwrap();
        add(&db, account, (2024, 1, 1), "A", -10.0, None, Some("1234"));
        add(&db, account, (2024, 1, 2), "B", -10.0, None, Some("1234"));
        add(&db, account, (2024, 1, 3), "C", -10.0, None, Some("5678"));

        let classifier = Classifier::new(&db, &holders);
        let applied = classifier.apply_card_holders().unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].holder, "Dana");
        assert_eq!(applied[0].result.tagged, 2);
        assert_eq!(applied[1].result.tagged, 1);

        let again = classifier.apply_card_holders().unwrap();
        assert!(again.iter().all(|h| h.result.tagged == 0));
    }

    #[test]
    fn test_scope_limits_bulk_operations() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        let january = add(&db, account, (2024, 1, 15), "CAFE", -10.0, None, None);
        let february = add(&db, account, (2024, 2, 15), "CAFE", -10.0, None, None);

        let scope = ClassifyScope::all().account(account).between(
            NaiveDate::from_ymd_opt(2024, 2, 1),
            NaiveDate::from_ymd_opt(2024, 2, 29),
        );
        let classifier = Classifier::new(&db, &holders).with_scope(scope);
        let result = classifier.bulk_by_merchant("cafe", &["coffee"]).unwrap();

        assert_eq!(result.tagged, 1);
        assert!(db.tags_for(january).unwrap().is_empty());
        assert!(db.tags_for(february).unwrap().contains("coffee"));

        let inverted = ClassifyScope::all().between(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 2, 1),
        );
        let err = Classifier::new(&db, &holders)
            .with_scope(inverted)
            .bulk_by_merchant("cafe", &["coffee"])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_migrate_categories_dry_run_then_apply() {
        let (db, account) = setup();
        let holders = CardHolderMap::new();
        add(&db, account, (2024, 1, 1), "A", -10.0, Some("Groceries"), None);
        add(&db, account, (2024, 1, 2), "B", -10.0, Some("Groceries"), None);
        add(&db, account, (2024, 1, 3), "C", -10.0, Some("Transport"), None);
        add(&db, account, (2024, 1, 4), "D", -10.0, None, None);

        let classifier = Classifier::new(&db, &holders);

        let preview = classifier.migrate_categories(true).unwrap();
        assert!(preview.dry_run);
        assert_eq!(preview.categories.get("Groceries"), Some(&2));
        assert_eq!(preview.categories.get("Transport"), Some(&1));
        assert_eq!(preview.total(), 3);
        assert!(db.list_tags().unwrap().is_empty());
        assert_eq!(db.count_assignments().unwrap(), 0);

        let applied = classifier.migrate_categories(false).unwrap();
        assert_eq!(applied.categories, preview.categories);
        assert_eq!(db.untagged_count().unwrap(), 1);

        let again = classifier.migrate_categories(false).unwrap();
        assert_eq!(again.total(), 0);
        assert_eq!(db.count_assignments().unwrap(), 3);
    }
}
