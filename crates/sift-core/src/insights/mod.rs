//! Insight Engine - visual primitives and textual insights
//!
//! Everything here is a pure function over report output; nothing touches the
//! database and nothing is persisted.
//!
//! - **Visuals** - proportional bars, sparklines and trend arrows
//! - **Generator** - a short, fixed-order list of spending observations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sift_core::insights::{generate_insights, sparkline};
//!
//! let buckets = db.monthly_trends(6, None, None)?;
//! let trends = db.category_trends(6, 5)?;
//! let amounts: Vec<f64> = buckets.iter().map(|b| b.amount).collect();
//! println!("{}", sparkline(&amounts, 6));
//! for line in generate_insights(&buckets, &trends.series) {
//!     println!("{}", line);
//! }
//! ```

pub mod generator;
pub mod visuals;

pub use generator::{generate_insights, MAX_INSIGHTS};
pub use visuals::{bar, sparkline, trend_indicator, Trend, TrendDirection, SPARK_GLYPHS};
