//! Explicit transaction boundary for mutations

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;

/// An open write transaction on one connection
///
/// Dropping a unit of work that was neither committed nor rolled back rolls it
/// back, so an early `?` return never leaves partial writes behind.
pub struct UnitOfWork<'c> {
    conn: &'c Connection,
    finished: bool,
}

impl<'c> UnitOfWork<'c> {
    /// Start a write transaction, taking the write lock immediately
    pub fn begin(conn: &'c Connection) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        debug!("Unit of work started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(e.into());
        }
        debug!("Unit of work committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        warn!("Unit of work rolled back");
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback on drop failed");
            } else {
                warn!("Unit of work dropped without commit, rolled back");
            }
        }
    }
}
