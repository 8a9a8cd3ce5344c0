//! User configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/sift/config.toml)
//! 2. The embedded defaults (compiled into binary)
//!
//! The card holder mapping is handed to the classifier and the card report as a
//! [`CardHolderProvider`]; nothing reads it from global state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::validate_card_suffix;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/sift.toml");

const DEFAULT_MONTHS: usize = 6;
const DEFAULT_TOP_CATEGORIES: usize = 5;

/// Source of card suffix -> holder name mappings
pub trait CardHolderProvider {
    /// Holder name for a card suffix, if one is configured
    fn holder_for(&self, card_suffix: &str) -> Option<&str>;

    /// Every (card suffix, holder name) pair, ordered by suffix
    fn mappings(&self) -> Vec<(&str, &str)>;
}

/// Card holder mapping backed by a sorted map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardHolderMap {
    holders: BTreeMap<String, String>,
}

impl CardHolderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping; the suffix must be 4 digits and the name non-empty
    pub fn insert(&mut self, card_suffix: &str, holder: &str) -> Result<()> {
        let suffix = validate_card_suffix(card_suffix)?;
        let holder = holder.trim();
        if holder.is_empty() {
            return Err(Error::Validation(format!(
                "Holder name for card {} cannot be empty",
                suffix
            )));
        }
        self.holders.insert(suffix.to_string(), holder.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

impl CardHolderProvider for CardHolderMap {
    fn holder_for(&self, card_suffix: &str) -> Option<&str> {
        self.holders.get(card_suffix.trim()).map(String::as_str)
    }

    fn mappings(&self) -> Vec<(&str, &str)> {
        self.holders
            .iter()
            .map(|(suffix, holder)| (suffix.as_str(), holder.as_str()))
            .collect()
    }
}

/// Report defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSettings {
    pub default_months: usize,
    pub top_categories: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            default_months: DEFAULT_MONTHS,
            top_categories: DEFAULT_TOP_CATEGORIES,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub card_holders: CardHolderMap,
    pub reports: ReportSettings,
    /// File the config was read from (`None` for embedded defaults)
    source: Option<PathBuf>,
}

impl Config {
    /// Load config from `path`, else the data-dir override, else the defaults
    ///
    /// An explicit path that does not exist is `NotFound`; a missing data-dir
    /// override is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Config file {}",
                    path.display()
                )));
            }
            return Self::load_file(path);
        }

        match default_config_path() {
            Some(default_path) if default_path.exists() => Self::load_file(&default_path),
            _ => Self::parse(DEFAULT_CONFIG),
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.source = Some(path.to_path_buf());
        debug!(path = %path.display(), holders = config.card_holders.len(), "Loaded config");
        Ok(config)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut config = Config::default();

        if let Some(reports) = raw.reports {
            if let Some(months) = reports.default_months {
                if months == 0 {
                    return Err(Error::Validation(
                        "reports.default_months must be at least 1".to_string(),
                    ));
                }
                config.reports.default_months = months;
            }
            if let Some(top) = reports.top_categories {
                config.reports.top_categories = top;
            }
        }

        for (suffix, holder) in raw.card_holders.unwrap_or_default() {
            config.card_holders.insert(&suffix, &holder)?;
        }

        Ok(config)
    }

    /// Get the config path (if loaded from a file)
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("config.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    reports: Option<RawReports>,
    card_holders: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawReports {
    default_months: Option<usize>,
    top_categories: Option<usize>,
}
