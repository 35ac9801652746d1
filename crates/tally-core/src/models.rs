//! Domain models for Tally

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Subcategory used when a classifier answer names only a main category
pub const DEFAULT_SUBCATEGORY: &str = "general";

/// Subcategory recorded when classification fails
pub const ERROR_SUBCATEGORY: &str = "error";

/// Column layout of an account export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSchema {
    /// Checking/debit export: Details,Posting Date,Description,Amount,Type,Balance
    Checking,
    /// Credit card export: Transaction Date,...,Description,Category,Type,Amount
    Credit,
}

impl SourceSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Credit => "credit",
        }
    }
}

impl std::fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction date as it appeared in the export
///
/// The raw text is always kept; `parsed` is `None` when none of the
/// known date formats matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDate {
    pub raw: String,
    pub parsed: Option<NaiveDate>,
}

impl TransactionDate {
    pub fn new(raw: impl Into<String>, parsed: Option<NaiveDate>) -> Self {
        Self {
            raw: raw.into(),
            parsed,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }
}

impl std::fmt::Display for TransactionDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Canonical transaction produced by the schema normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: TransactionDate,
    pub description: String,
    /// Signed amount: positive = inflow, negative = outflow
    pub amount: Decimal,
    /// Derived from the source file name
    pub account: String,
    /// Category label from the export, if the schema has one
    pub raw_category: Option<String>,
    /// Source-specific code (ACH_DEBIT, Sale, ...); empty when absent
    pub transaction_type: String,
    /// Running balance (checking exports only)
    pub balance: Option<Decimal>,
    pub source_file: String,
    /// 1-based CSV line number
    pub source_line: u64,
}

impl Transaction {
    /// Raw category or empty string, for prompts and report rows
    pub fn raw_category_str(&self) -> &str {
        self.raw_category.as_deref().unwrap_or("")
    }
}

/// Closed set of budget categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MainCategory {
    Incoming,
    Spending,
    Investments,
    Unknown,
}

impl MainCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "Incoming",
            Self::Spending => "Spending",
            Self::Investments => "Investments",
            Self::Unknown => "Unknown",
        }
    }

    pub fn all() -> &'static [MainCategory] {
        &[
            Self::Incoming,
            Self::Spending,
            Self::Investments,
            Self::Unknown,
        ]
    }
}

impl std::str::FromStr for MainCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incoming" => Ok(Self::Incoming),
            "spending" => Ok(Self::Spending),
            "investments" | "investment" => Ok(Self::Investments),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown main category: {}", s)),
        }
    }
}

impl std::fmt::Display for MainCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    Success {
        main: MainCategory,
        subcategory: String,
    },
    Failure {
        reason: String,
    },
}

impl ClassificationOutcome {
    pub fn success(main: MainCategory, subcategory: impl Into<String>) -> Self {
        let subcategory = subcategory.into();
        let subcategory = if subcategory.trim().is_empty() {
            DEFAULT_SUBCATEGORY.to_string()
        } else {
            subcategory
        };
        Self::Success { main, subcategory }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Bucket key for this outcome; failures land in Unknown/error
    pub fn category(&self) -> (MainCategory, &str) {
        match self {
            Self::Success { main, subcategory } => (*main, subcategory.as_str()),
            Self::Failure { .. } => (MainCategory::Unknown, ERROR_SUBCATEGORY),
        }
    }
}

/// A transaction with its budget category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub transaction: Transaction,
    pub main_category: MainCategory,
    pub subcategory: String,
}

impl ClassifiedTransaction {
    pub fn new(transaction: Transaction, outcome: &ClassificationOutcome) -> Self {
        let (main_category, subcategory) = outcome.category();
        Self {
            transaction,
            main_category,
            subcategory: subcategory.to_string(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.transaction.amount
    }
}

fn two_places(amount: Decimal) -> String {
    let rounded = amount
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Format a signed amount as `+$X.XX` / `-$X.XX`
///
/// Anything that is not strictly positive gets a minus sign, so zero
/// renders as `-$0.00`.
pub fn format_signed(amount: Decimal) -> String {
    let sign = if amount > Decimal::ZERO { '+' } else { '-' };
    format!("{}${}", sign, two_places(amount))
}

/// Format the absolute magnitude of an amount as `$X.XX`
pub fn format_magnitude(amount: Decimal) -> String {
    format!("${}", two_places(amount))
}
