//! Tag store: tag identity and transaction-tag assignments
//!
//! Tag names are unique case-insensitively. Uniqueness lives in the `name_key`
//! column (Unicode lowercase of the trimmed name); `name` keeps the spelling the
//! tag was created or last renamed with.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{RenameOutcome, Tag, TagStats, TagStatsReport};

/// Key used for case-insensitive tag identity
pub(crate) fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn clean_tag_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Tag name cannot be empty".to_string()));
    }
    Ok(trimmed)
}

impl Database {
    // ========== Tag Identity ==========

    /// Look up a tag by name (case-insensitive), creating it on a miss
    pub fn get_or_create_tag(&self, name: &str) -> Result<Tag> {
        self.unit_of_work(|conn| Self::get_or_create_tag_with_conn(conn, name))
    }

    pub(crate) fn get_or_create_tag_with_conn(conn: &Connection, name: &str) -> Result<Tag> {
        let name = clean_tag_name(name)?;

        if let Some(tag) = Self::find_tag_with_conn(conn, name)? {
            return Ok(tag);
        }

        conn.execute(
            "INSERT INTO tags (name, name_key) VALUES (?, ?)",
            params![name, tag_key(name)],
        )?;
        let id = conn.last_insert_rowid();
        debug!(tag_id = id, tag = name, "Created tag");

        Self::find_tag_with_conn(conn, name)?
            .ok_or_else(|| Error::NotFound(format!("Tag '{}'", name)))
    }

    /// Find a tag by name (case-insensitive)
    pub fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        Self::find_tag_with_conn(&conn, name)
    }

    pub(crate) fn find_tag_with_conn(conn: &Connection, name: &str) -> Result<Option<Tag>> {
        let tag = conn
            .query_row(
                "SELECT id, name, created_at FROM tags WHERE name_key = ?",
                params![tag_key(name)],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    /// Find a tag or fail with `NotFound`
    pub(crate) fn require_tag_with_conn(conn: &Connection, name: &str) -> Result<Tag> {
        Self::find_tag_with_conn(conn, name)?
            .ok_or_else(|| Error::NotFound(format!("Tag '{}'", name.trim())))
    }

    /// List all tags ordered by name
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM tags ORDER BY name_key")?;

        let tags = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Rename a tag, merging into the target when the new name already exists
    ///
    /// A merge repoints every assignment of `old` to the existing tag (pairs the
    /// target already holds are skipped) and deletes `old`. The whole operation is
    /// one unit of work.
    pub fn rename_tag(&self, old: &str, new: &str) -> Result<RenameOutcome> {
        let new = clean_tag_name(new)?;

        let outcome = self.unit_of_work(|conn| {
            let source = Self::require_tag_with_conn(conn, old)?;

            match Self::find_tag_with_conn(conn, new)? {
                Some(target) if target.id != source.id => {
                    let source_count: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM transaction_tags WHERE tag_id = ?",
                        params![source.id],
                        |row| row.get(0),
                    )?;

                    let moved = conn.execute(
                        r#"
                        INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id, created_at)
                        SELECT transaction_id, ?, created_at
                        FROM transaction_tags WHERE tag_id = ?
                        "#,
                        params![target.id, source.id],
                    )?;

                    conn.execute(
                        "DELETE FROM transaction_tags WHERE tag_id = ?",
                        params![source.id],
                    )?;
                    conn.execute("DELETE FROM tags WHERE id = ?", params![source.id])?;

                    Ok(RenameOutcome::Merged {
                        target_id: target.id,
                        moved,
                        skipped: (source_count as usize).saturating_sub(moved),
                    })
                }
                // Fresh name, or a case-only change of the same tag
                _ => {
                    conn.execute(
                        "UPDATE tags SET name = ?, name_key = ? WHERE id = ?",
                        params![new, tag_key(new), source.id],
                    )?;
                    Ok(RenameOutcome::Renamed { tag_id: source.id })
                }
            }
        })?;

        info!(from = old, to = new, outcome = ?outcome, "Renamed tag");
        Ok(outcome)
    }

    /// Delete a tag and all of its assignments
    ///
    /// Returns the number of assignments removed. Deleting a tag that does not
    /// exist is `NotFound`; callers retrying a delete should treat that as done.
    pub fn delete_tag(&self, name: &str) -> Result<usize> {
        let removed = self.unit_of_work(|conn| {
            let tag = Self::require_tag_with_conn(conn, name)?;
            let removed = conn.execute(
                "DELETE FROM transaction_tags WHERE tag_id = ?",
                params![tag.id],
            )?;
            conn.execute("DELETE FROM tags WHERE id = ?", params![tag.id])?;
            Ok(removed)
        })?;

        info!(tag = name, assignments_removed = removed, "Deleted tag");
        Ok(removed)
    }

    // ========== Transaction-Tag Operations ==========

    /// Attach tags to a transaction, creating tags as needed
    ///
    /// Returns the number of assignments newly created; names already attached
    /// are skipped.
    pub fn assign_tags<S: AsRef<str>>(&self, transaction_id: i64, names: &[S]) -> Result<usize> {
        let created = self.unit_of_work(|conn| {
            Self::require_transaction_with_conn(conn, transaction_id)?;

            let mut tag_ids = Vec::with_capacity(names.len());
            for name in names {
                tag_ids.push(Self::get_or_create_tag_with_conn(conn, name.as_ref())?.id);
            }
            Self::assign_tag_ids_with_conn(conn, transaction_id, &tag_ids)
        })?;

        debug!(transaction_id, created, "Assigned tags");
        Ok(created)
    }

    /// Insert assignments that are missing; returns how many rows were created
    pub(crate) fn assign_tag_ids_with_conn(
        conn: &Connection,
        transaction_id: i64,
        tag_ids: &[i64],
    ) -> Result<usize> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
        )?;

        let mut created = 0;
        for tag_id in tag_ids {
            created += stmt.execute(params![transaction_id, tag_id])?;
        }
        Ok(created)
    }

    pub(crate) fn has_assignment_with_conn(
        conn: &Connection,
        transaction_id: i64,
        tag_id: i64,
    ) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM transaction_tags WHERE transaction_id = ? AND tag_id = ?",
                params![transaction_id, tag_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Detach tags from a transaction; returns how many assignments were removed
    pub fn unassign_tags<S: AsRef<str>>(
        &self,
        transaction_id: i64,
        names: &[S],
    ) -> Result<usize> {
        let removed = self.unit_of_work(|conn| {
            Self::require_transaction_with_conn(conn, transaction_id)?;

            let mut removed = 0;
            for name in names {
                if let Some(tag) = Self::find_tag_with_conn(conn, name.as_ref())? {
                    removed += conn.execute(
                        "DELETE FROM transaction_tags WHERE transaction_id = ? AND tag_id = ?",
                        params![transaction_id, tag.id],
                    )?;
                }
            }
            Ok(removed)
        })?;

        debug!(transaction_id, removed, "Unassigned tags");
        Ok(removed)
    }

    /// Names of the tags attached to a transaction
    pub fn tags_for(&self, transaction_id: i64) -> Result<BTreeSet<String>> {
        let conn = self.conn()?;
        Self::require_transaction_with_conn(&conn, transaction_id)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT g.name
            FROM transaction_tags tt
            INNER JOIN tags g ON g.id = tt.tag_id
            WHERE tt.transaction_id = ?
            "#,
        )?;

        let names = stmt
            .query_map(params![transaction_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        Ok(names)
    }

    /// IDs of transactions holding a tag
    pub fn transaction_ids_with_tag(&self, name: &str) -> Result<BTreeSet<i64>> {
        let conn = self.conn()?;
        let tag = Self::require_tag_with_conn(&conn, name)?;

        let mut stmt =
            conn.prepare("SELECT transaction_id FROM transaction_tags WHERE tag_id = ?")?;
        let ids = stmt
            .query_map(params![tag.id], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        Ok(ids)
    }

    fn require_transaction_with_conn(conn: &Connection, transaction_id: i64) -> Result<()> {
        if Self::transaction_exists_with_conn(conn, transaction_id)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Transaction {}", transaction_id)))
        }
    }

    // ========== Tag Statistics ==========

    /// Assignment count and signed total per tag, plus the untagged remainder
    pub fn tag_stats(&self) -> Result<TagStatsReport> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT g.id, g.name, COUNT(t.id), COALESCE(SUM(t.amount), 0.0)
            FROM tags g
            LEFT JOIN transaction_tags tt ON tt.tag_id = g.id
            LEFT JOIN transactions t ON t.id = tt.transaction_id
            GROUP BY g.id, g.name
            ORDER BY COUNT(t.id) DESC, g.name_key
            "#,
        )?;

        let tags = stmt
            .query_map([], |row| {
                Ok(TagStats {
                    tag_id: row.get(0)?,
                    name: row.get(1)?,
                    transaction_count: row.get(2)?,
                    total: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (untagged_count, untagged_total) = Self::untagged_with_conn(&conn)?;

        Ok(TagStatsReport {
            tags,
            untagged_count,
            untagged_total,
        })
    }

    /// Number of transactions with no tags
    pub fn untagged_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(Self::untagged_with_conn(&conn)?.0)
    }

    /// Signed sum of transactions with no tags
    pub fn untagged_total(&self) -> Result<f64> {
        let conn = self.conn()?;
        Ok(Self::untagged_with_conn(&conn)?.1)
    }

    fn untagged_with_conn(conn: &Connection) -> Result<(i64, f64)> {
        let result = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(t.amount), 0.0)
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM transaction_tags tt WHERE tt.transaction_id = t.id)
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(result)
    }

    /// Total number of assignment rows
    pub fn count_assignments(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transaction_tags", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}
