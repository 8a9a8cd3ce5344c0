//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config, exit codes)
//! - `accounts` - Institution account registration and listing
//! - `tags` - Tag management and per-transaction tagging
//! - `classify` - Bulk classification commands
//! - `reports` - Report generation commands
//! - `insights` - Auto-generated insights

pub mod accounts;
pub mod classify;
pub mod core;
pub mod insights;
pub mod reports;
pub mod tags;

// Re-export command functions for main.rs
pub use accounts::*;
pub use classify::*;
pub use self::core::*;
pub use insights::*;
pub use reports::*;
pub use tags::*;

use anyhow::{Context, Result};
use serde::Serialize;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
///
/// Counts characters rather than bytes so Hebrew descriptions never split mid-codepoint.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print any result value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Format an amount with thousands separators, e.g. -1,234.50
pub fn format_amount(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}
