//! Transaction operations
//!
//! Transactions are delivered by the ingestion side through `insert_transaction`;
//! the only field the core itself changes is the user category override.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{validate_card_suffix, NewTransaction, Transaction};

/// Column list matching `row_to_transaction`
pub(crate) const TX_COLUMNS: &str = "t.id, t.account_id, t.date, t.description, t.amount, \
     t.currency, t.category, t.category_normalized, t.user_category, t.card_suffix, \
     t.status, t.transaction_type, t.import_hash, t.created_at";

impl Database {
    /// Map a row selected with `TX_COLUMNS` to a transaction
    pub(crate) fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let status_str: String = row.get(10)?;
        let type_str: String = row.get(11)?;
        let created_at_str: String = row.get(13)?;

        Ok(Transaction {
            id: row.get(0)?,
            account_id: row.get(1)?,
            date: parse_date(2, &date_str)?,
            description: row.get(3)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            category: row.get(6)?,
            category_normalized: row.get(7)?,
            user_category: row.get(8)?,
            card_suffix: row.get(9)?,
            status: status_str
                .parse()
                .unwrap_or(crate::models::TransactionStatus::Posted),
            transaction_type: type_str
                .parse()
                .unwrap_or(crate::models::TransactionType::Other),
            import_hash: row.get(12)?,
            created_at: parse_datetime(&created_at_str),
        })
    }

    /// Insert a transaction (skips duplicates based on import_hash)
    ///
    /// Returns `None` when a transaction with the same hash already exists.
    pub fn insert_transaction(&self, account_id: i64, tx: &NewTransaction) -> Result<Option<i64>> {
        let card_suffix = match tx.card_suffix.as_deref() {
            Some(s) => Some(validate_card_suffix(s)?.to_string()),
            None => None,
        };

        let conn = self.conn()?;

        let account_exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE id = ?",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;
        if account_exists.is_none() {
            return Err(Error::NotFound(format!("Account {}", account_id)));
        }

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            debug!(import_hash = %tx.import_hash, "Skipping duplicate transaction");
            return Ok(None);
        }

        conn.execute(
            r#"
            INSERT INTO transactions (account_id, date, description, amount, currency, category,
                                      category_normalized, card_suffix, status, transaction_type, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                account_id,
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.currency,
                tx.category,
                tx.category_normalized,
                card_suffix,
                tx.status.as_str(),
                tx.transaction_type.as_str(),
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions t WHERE t.id = ?", TX_COLUMNS);
        let tx = conn
            .query_row(&sql, params![id], |row| Self::row_to_transaction(row))
            .optional()?;
        Ok(tx)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions t ORDER BY t.date DESC, t.id DESC LIMIT ? OFFSET ?",
            TX_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![limit, offset], |row| Self::row_to_transaction(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Transactions in scope, using an existing connection (safe inside a unit of work)
    pub(crate) fn transactions_between_with_conn(
        conn: &Connection,
        account_id: Option<i64>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>> {
        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(aid) = account_id {
            conditions.push("t.account_id = ?");
            values.push(Box::new(aid));
        }
        if let Some(f) = from {
            conditions.push("t.date >= ?");
            values.push(Box::new(f.to_string()));
        }
        if let Some(t) = to {
            conditions.push("t.date <= ?");
            values.push(Box::new(t.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM transactions t {} ORDER BY t.date, t.id",
            TX_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let transactions = stmt
            .query_map(params_refs.as_slice(), |row| Self::row_to_transaction(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Set or clear the user category override
    pub fn set_user_category(&self, id: i64, category: Option<&str>) -> Result<()> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE transactions SET user_category = ? WHERE id = ?",
            params![category, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }

        info!(transaction_id = id, category = ?category, "Updated user category");
        Ok(())
    }

    /// Date of the newest transaction, if any
    pub fn latest_transaction_date(&self) -> Result<Option<NaiveDate>> {
        let conn = self.conn()?;
        Self::latest_transaction_date_with_conn(&conn)
    }

    pub(crate) fn latest_transaction_date_with_conn(conn: &Connection) -> Result<Option<NaiveDate>> {
        let latest: Option<String> =
            conn.query_row("SELECT MAX(date) FROM transactions", [], |row| row.get(0))?;
        latest.map(|s| parse_date(0, &s)).transpose().map_err(Error::from)
    }

    pub(crate) fn transaction_exists_with_conn(conn: &Connection, id: i64) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
