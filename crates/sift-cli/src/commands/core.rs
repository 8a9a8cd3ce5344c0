//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the config file
//! - `exit_code_for` - Map errors to process exit codes
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sift_core::{db::Database, Config, Error};

/// Exit code for invalid input (bad suffix, empty pattern, inverted range)
const EXIT_VALIDATION: u8 = 2;
/// Exit code for a missing tag, transaction, account or config file
const EXIT_NOT_FOUND: u8 = 3;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the config file, falling back to built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load config")
}

/// Process exit code for an error returned by a command
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_not_found() => ExitCode::from(EXIT_NOT_FOUND),
        Some(Error::Validation(_)) => ExitCode::from(EXIT_VALIDATION),
        _ => ExitCode::FAILURE,
    }
}

/// Parse an optional YYYY-MM-DD argument
pub fn parse_date_arg(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .with_context(|| format!("Invalid {} date '{}' (use YYYY-MM-DD)", flag, v))
        })
        .transpose()
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if db.is_encrypted()? {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Register an account: sift accounts add \"My Card\" -i max --username ... --password ...");
    println!("  2. Classify spending:   sift classify migrate --dry-run");
    println!("  3. See the trend:       sift report trends");

    Ok(())
}
