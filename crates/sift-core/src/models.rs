//! Domain models for Sift

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::periods::YearMonth;

/// Category reported for transactions with no category at all
pub const UNCATEGORIZED: &str = "Uncategorized";

// ========== Accounts ==========

/// An institution account the ingestion side pulls transactions from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub institution: Institution,
    /// Non-secret login identity (username or label), never the password
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

/// Supported institutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Institution {
    Hapoalim,
    Leumi,
    Discount,
    Isracard,
    Max,
    VisaCal,
}

impl Institution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hapoalim => "hapoalim",
            Self::Leumi => "leumi",
            Self::Discount => "discount",
            Self::Isracard => "isracard",
            Self::Max => "max",
            Self::VisaCal => "visacal",
        }
    }

    /// Which credential shape this institution's login requires
    pub fn credential_kind(&self) -> CredentialKind {
        match self {
            Self::Hapoalim | Self::Discount | Self::Isracard => CredentialKind::UserIdLabel,
            Self::Leumi | Self::Max | Self::VisaCal => CredentialKind::UsernamePassword,
        }
    }
}

impl std::str::FromStr for Institution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hapoalim" | "poalim" => Ok(Self::Hapoalim),
            "leumi" => Ok(Self::Leumi),
            "discount" => Ok(Self::Discount),
            "isracard" => Ok(Self::Isracard),
            "max" => Ok(Self::Max),
            "visacal" | "visa_cal" | "cal" => Ok(Self::VisaCal),
            _ => Err(Error::Validation(format!("Unknown institution: {}", s))),
        }
    }
}

impl std::fmt::Display for Institution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    UsernamePassword,
    UserIdLabel,
}

/// Login credentials, one variant per credential shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    UsernamePassword { username: String, password: String },
    UserIdLabel { user_id: String, label: String },
}

impl Credentials {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::UsernamePassword { .. } => CredentialKind::UsernamePassword,
            Self::UserIdLabel { .. } => CredentialKind::UserIdLabel,
        }
    }

    /// The part of the credentials that is safe to persist and display
    pub fn identity(&self) -> &str {
        match self {
            Self::UsernamePassword { username, .. } => username,
            Self::UserIdLabel { label, .. } => label,
        }
    }

    /// Check required fields and that the shape matches the institution
    pub fn validate_for(&self, institution: Institution) -> Result<()> {
        if self.kind() != institution.credential_kind() {
            return Err(Error::Validation(format!(
                "{} requires {:?} credentials",
                institution,
                institution.credential_kind()
            )));
        }

        let missing = match self {
            Self::UsernamePassword { username, password } => {
                if username.trim().is_empty() {
                    Some("username")
                } else if password.is_empty() {
                    Some("password")
                } else {
                    None
                }
            }
            Self::UserIdLabel { user_id, label } => {
                if user_id.trim().is_empty() {
                    Some("user id")
                } else if label.trim().is_empty() {
                    Some("label")
                } else {
                    None
                }
            }
        };

        match missing {
            Some(field) => Err(Error::Validation(format!(
                "Missing {} for {}",
                field, institution
            ))),
            None => Ok(()),
        }
    }
}

// ========== Transactions ==========

/// Settlement status reported by the institution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Posted,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "posted" | "completed" => Ok(Self::Posted),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Charge,
    Refund,
    Payment,
    Transfer,
    Income,
    Fee,
    Other,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Refund => "refund",
            Self::Payment => "payment",
            Self::Transfer => "transfer",
            Self::Income => "income",
            Self::Fee => "fee",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "charge" | "normal" => Ok(Self::Charge),
            "refund" => Ok(Self::Refund),
            "payment" | "installments" => Ok(Self::Payment),
            "transfer" => Ok(Self::Transfer),
            "income" => Ok(Self::Income),
            "fee" => Ok(Self::Fee),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = money out, positive = money in
    pub amount: f64,
    pub currency: String,
    /// Category string exactly as the institution sent it
    pub category: Option<String>,
    /// Category after ingestion-side normalization
    pub category_normalized: Option<String>,
    /// User override, the only field the core writes
    pub user_category: Option<String>,
    /// Last 4 digits of the card, when the account has cards
    pub card_suffix: Option<String>,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    /// Hash for deduplication
    pub import_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Category used for classification and breakdowns:
    /// user override, then normalized, then raw. Blank values count as absent.
    pub fn effective_category(&self) -> Option<&str> {
        [
            self.user_category.as_deref(),
            self.category_normalized.as_deref(),
            self.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|c| !c.is_empty())
    }
}

/// A transaction delivered by the ingestion side (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub category: Option<String>,
    pub category_normalized: Option<String>,
    pub card_suffix: Option<String>,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub import_hash: String,
}

impl NewTransaction {
    /// A posted charge in ILS with a hash derived from date, description and amount
    pub fn new(date: NaiveDate, description: &str, amount: f64) -> Self {
        Self {
            date,
            description: description.to_string(),
            amount,
            currency: "ILS".to_string(),
            category: None,
            category_normalized: None,
            card_suffix: None,
            status: TransactionStatus::Posted,
            transaction_type: TransactionType::Charge,
            import_hash: generate_import_hash(&date, description, amount, None),
        }
    }
}

/// Generate a unique hash for deduplication
///
/// `reference` is the institution's own transaction identifier when it has one,
/// which keeps two identical purchases on the same day apart.
pub fn generate_import_hash(
    date: &NaiveDate,
    description: &str,
    amount: f64,
    reference: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    if let Some(ref_str) = reference {
        hasher.update(b"|");
        hasher.update(ref_str.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Validate a card suffix: exactly 4 ASCII digits
pub fn validate_card_suffix(suffix: &str) -> Result<&str> {
    let trimmed = suffix.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(trimmed)
    } else {
        Err(Error::Validation(format!(
            "Card suffix must be exactly 4 digits, got '{}'",
            suffix
        )))
    }
}

// ========== Tag Models ==========

/// A user-defined label, unique by case-insensitive name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// What a rename did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenameOutcome {
    /// The tag row kept its identity and changed name
    Renamed { tag_id: i64 },
    /// The target name already existed; assignments were folded into it
    Merged {
        target_id: i64,
        /// Assignments repointed to the target
        moved: usize,
        /// Assignments dropped because the target already had that transaction
        skipped: usize,
    },
}

/// Usage of one tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagStats {
    pub tag_id: i64,
    pub name: String,
    pub transaction_count: i64,
    /// Signed sum of the tagged transactions
    pub total: f64,
}

/// All tag usage plus the untagged remainder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagStatsReport {
    pub tags: Vec<TagStats>,
    pub untagged_count: i64,
    pub untagged_total: f64,
}

// ========== Classification Models ==========

/// Result of a bulk classification call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTagResult {
    /// Transactions selected by the filter
    pub matched: usize,
    /// Transactions that received at least one new assignment
    pub tagged: usize,
    /// Assignment rows created
    pub assignments_created: usize,
}

/// Result of migrating category strings into tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMigration {
    pub dry_run: bool,
    /// Category name -> transactions newly tagged (or that would be)
    pub categories: BTreeMap<String, usize>,
}

impl CategoryMigration {
    pub fn total(&self) -> usize {
        self.categories.values().sum()
    }
}

// ========== Report Models ==========

/// Signed total, count and mean for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
    pub average: f64,
}

/// One row of a grouped breakdown (status, type or account)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub count: i64,
}

/// Totals for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub transaction_count: i64,
    /// Signed net of all transactions
    pub net: f64,
    /// Sum of positive amounts
    pub income: f64,
    /// Sum of negative amounts (kept negative)
    pub expenses: f64,
    pub by_status: Vec<GroupTotal>,
    pub by_type: Vec<GroupTotal>,
    pub by_account: Vec<GroupTotal>,
}

/// One calendar month of a trend series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    /// Sum of absolute amounts
    pub amount: f64,
    pub count: i64,
}

impl MonthBucket {
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}

/// A category's per-month amounts aligned to a shared month axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub category: String,
    pub amounts: Vec<f64>,
}

impl CategorySeries {
    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }
}

/// Top categories over a month window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTrends {
    pub months: Vec<YearMonth>,
    pub series: Vec<CategorySeries>,
}

/// One card's share of spending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardHolderShare {
    pub card_suffix: String,
    /// Holder name from the card holder mapping, if configured
    pub holder: Option<String>,
    /// Sum of absolute amounts
    pub amount: f64,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardHolderBreakdown {
    pub months: Vec<YearMonth>,
    pub total: f64,
    pub cards: Vec<CardHolderShare>,
}

/// Spending for one tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSpending {
    pub tag: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Signed total
    pub total: f64,
    pub transaction_count: i64,
    pub by_category: Vec<CategoryTotal>,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_with_categories(
        raw: Option<&str>,
        normalized: Option<&str>,
        user: Option<&str>,
    ) -> Transaction {
        Transaction {
            id: 1,
            account_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "TEST".to_string(),
            amount: -10.0,
            currency: "ILS".to_string(),
            category: raw.map(String::from),
            category_normalized: normalized.map(String::from),
            user_category: user.map(String::from),
            card_suffix: None,
            status: TransactionStatus::Posted,
            transaction_type: TransactionType::Charge,
            import_hash: "h".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_category_precedence() {
        let tx = tx_with_categories(Some("raw"), Some("norm"), Some("user"));
        assert_eq!(tx.effective_category(), Some("user"));

        let tx = tx_with_categories(Some("raw"), Some("norm"), None);
        assert_eq!(tx.effective_category(), Some("norm"));

        let tx = tx_with_categories(Some("raw"), Some("  "), None);
        assert_eq!(tx.effective_category(), Some("raw"));

        let tx = tx_with_categories(None, None, None);
        assert_eq!(tx.effective_category(), None);
    }

    #[test]
    fn test_card_suffix_validation() {
        assert_eq!(validate_card_suffix("1234").unwrap(), "1234");
        assert_eq!(validate_card_suffix(" 0042 ").unwrap(), "0042");
        assert!(validate_card_suffix("123").is_err());
        assert!(validate_card_suffix("12345").is_err());
        assert!(validate_card_suffix("12a4").is_err());
        // Non-ASCII digits are rejected
        assert!(validate_card_suffix("١٢٣٤").is_err());
    }

    #[test]
    fn test_institution_parsing() {
        assert_eq!("Leumi".parse::<Institution>().unwrap(), Institution::Leumi);
        assert_eq!("cal".parse::<Institution>().unwrap(), Institution::VisaCal);
        let err = "mybank".parse::<Institution>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_credentials_must_match_institution() {
        let creds = Credentials::UsernamePassword {
            username: "dana".to_string(),
            password: "secret".to_string(),
        };
        assert!(creds.validate_for(Institution::Max).is_ok());
        assert!(creds.validate_for(Institution::Hapoalim).is_err());

        let creds = Credentials::UserIdLabel {
            user_id: "012345678".to_string(),
            label: "".to_string(),
        };
        let err = creds.validate_for(Institution::Isracard).unwrap_err();
        assert!(err.to_string().contains("label"));
        assert_eq!(creds.identity(), "");
    }

    #[test]
    fn test_import_hash_depends_on_reference() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = generate_import_hash(&date, "SHOP", -5.0, None);
        let b = generate_import_hash(&date, "SHOP", -5.0, Some("ref-1"));
        assert_ne!(a, b);
        assert_eq!(a, generate_import_hash(&date, "SHOP", -5.0, None));
        assert_eq!(a.len(), 64);
    }
}
