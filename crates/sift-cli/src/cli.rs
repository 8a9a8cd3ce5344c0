//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Sift - Classify and analyze your spending
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Tag classification and spending analytics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sift.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to ~/.local/share/sift/config.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SIFT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage institution accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Manage tags
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Add tags to a transaction
    Tag {
        /// Transaction ID
        transaction_id: i64,
        /// Tag names (created if missing)
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove tags from a transaction
    Untag {
        /// Transaction ID
        transaction_id: i64,
        /// Tag names
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Set or clear a transaction's category override
    Categorize {
        /// Transaction ID
        transaction_id: i64,
        /// New category (omit to clear the override)
        category: Option<String>,
    },

    /// Tag many transactions at once
    Classify {
        #[command(subcommand)]
        action: ClassifyAction,
    },

    /// Generate spending reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Show auto-generated spending insights
    Insights {
        /// Number of months to analyze (defaults to reports.default_months)
        #[arg(short, long)]
        months: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List registered accounts
    List,

    /// Register an institution account
    ///
    /// Leumi, Max and Visa Cal log in with --username/--password;
    /// Hapoalim, Discount and Isracard with --user-id/--label.
    Add {
        /// Display name
        name: String,
        /// Institution: hapoalim, leumi, discount, isracard, max, visacal
        #[arg(short, long)]
        institution: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// List all tags
    List,

    /// Show tag usage and untagged totals
    Stats,

    /// Rename a tag (merges into the target if it already exists)
    Rename {
        /// Current tag name
        old_name: String,
        /// New name
        new_name: String,
    },

    /// Delete a tag and all its assignments
    Delete {
        /// Tag to delete
        tag: String,
    },
}

/// Which transactions a bulk classification looks at
#[derive(Args, Debug, Default)]
pub struct ScopeArgs {
    /// Only transactions of this account ID
    #[arg(long)]
    pub account: Option<i64>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand)]
pub enum ClassifyAction {
    /// Tag transactions whose description contains a pattern (case-insensitive)
    Merchant {
        /// Text to look for in descriptions
        pattern: String,
        /// Tags to apply (repeatable)
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Tag transactions by category (override, else normalized, else raw)
    Category {
        /// Exact category name
        category: String,
        /// Tags to apply (repeatable)
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Tag a card's transactions with its holder's name
    Card {
        /// Last 4 digits of the card
        suffix: String,
        /// Holder name to apply as a tag
        holder: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Apply every configured card holder mapping
    Holders {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Turn categories into tags of the same name
    Migrate {
        /// Show what would be tagged without changing anything
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Spending by category
    Breakdown {
        /// Period: this-month, last-month, this-year, last-30-days, last-90-days, last-12-months
        #[arg(short, long, default_value = "this-month")]
        period: String,
        /// Custom start date (YYYY-MM-DD), overrides period
        #[arg(long)]
        from: Option<String>,
        /// Custom end date (YYYY-MM-DD), overrides period
        #[arg(long)]
        to: Option<String>,
    },

    /// Totals for one calendar month
    Monthly {
        /// Month as YYYY-MM (defaults to the month of the newest transaction)
        month: Option<String>,
    },

    /// Month-by-month spending
    Trends {
        /// Number of months (defaults to reports.default_months)
        #[arg(short, long)]
        months: Option<usize>,
        /// Only transactions with this tag
        #[arg(long)]
        tag: Option<String>,
        /// Only transactions made with this card (last 4 digits)
        #[arg(long)]
        card: Option<String>,
    },

    /// Top categories over time
    Categories {
        /// Number of months (defaults to reports.default_months)
        #[arg(short, long)]
        months: Option<usize>,
        /// Number of categories (defaults to reports.top_categories)
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Spending share per card holder
    Cards {
        /// Number of months (defaults to reports.default_months)
        #[arg(short, long)]
        months: Option<usize>,
    },

    /// Spending for one tag
    Tag {
        /// Tag name
        tag: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}
