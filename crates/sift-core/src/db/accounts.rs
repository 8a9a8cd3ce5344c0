//! Account operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, Credentials, Institution};

impl Database {
    /// Register an institution account, or return the existing one
    ///
    /// Credentials are validated against the institution's required shape; only
    /// the non-secret identity is stored.
    pub fn register_account(
        &self,
        name: &str,
        institution: Institution,
        credentials: &Credentials,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Account name cannot be empty".to_string()));
        }
        credentials.validate_for(institution)?;

        let conn = self.conn()?;
        let identity = credentials.identity().trim();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE institution = ? AND identity = ?",
                params![institution.as_str(), identity],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO accounts (name, institution, identity) VALUES (?, ?, ?)",
            params![name.trim(), institution.as_str(), identity],
        )?;
        let id = conn.last_insert_rowid();

        info!(account_id = id, institution = %institution, "Registered account");
        Ok(id)
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, institution, identity, created_at FROM accounts ORDER BY name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, institution, identity, created_at)| {
                Ok(Account {
                    id,
                    name,
                    institution: institution.parse()?,
                    identity,
                    created_at: parse_datetime(&created_at),
                })
            })
            .collect()
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.list_accounts()?.into_iter().find(|a| a.id == id))
    }
}
