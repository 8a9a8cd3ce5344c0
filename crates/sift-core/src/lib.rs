//! Sift Core Library
//!
//! Tag classification and spending analytics over an aggregated transaction store:
//! - Database access, migrations and the ingestion seam
//! - Tag store with case-insensitive identity and merge-on-rename
//! - Bulk classification by merchant, category and card
//! - Month-bucketed reports and card holder shares
//! - Insight engine: bars, sparklines, trend arrows and textual insights
//! - TOML configuration including the card holder mapping

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod periods;

pub use classify::{Classifier, ClassifyScope, HolderTagging};
pub use config::{CardHolderMap, CardHolderProvider, Config, ReportSettings};
pub use db::{Database, UnitOfWork};
pub use error::{Error, Result};
pub use insights::{generate_insights, Trend, TrendDirection};
pub use periods::YearMonth;
