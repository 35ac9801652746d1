//! Mock backend for testing
//!
//! Classifies from the taxonomy rules and a small keyword table, so runs are
//! deterministic and need no model server. Answers are produced as text and
//! go through the same parser as real backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{MainCategory, Transaction};
use crate::taxonomy::Taxonomy;

use super::parsing::parse_classification;
use super::types::Classification;
use super::AIBackend;

/// Description keywords checked after the taxonomy rules
const KEYWORDS: &[(&[&str], MainCategory, &str)] = &[
    (&["PAYROLL", "DIRECT DEP"], MainCategory::Incoming, "work"),
    (&["VENMO"], MainCategory::Incoming, "venmo"),
    (&["CASH DEPOSIT", "ATM DEPOSIT"], MainCategory::Incoming, "cash"),
    (&["RENT", "APARTMENTS"], MainCategory::Spending, "rent"),
    (&["ELECTRIC", "COMCAST", "XFINITY"], MainCategory::Spending, "utilities"),
    (&["LOAN", "CARDMEMBER SERV"], MainCategory::Spending, "debt payment"),
    (&["GEICO", "STATE FARM", "LEMONADE"], MainCategory::Spending, "insurance"),
    (&["SHELL", "CHEVRON", "EXXON", "JIFFY LUBE"], MainCategory::Spending, "car"),
    (
        &["TRADER JOE", "WHOLE FOODS", "WHOLEFDS", "SAFEWAY", "KROGER"],
        MainCategory::Spending,
        "groceries",
    ),
    (&["PLANET FITNESS", "GYM"], MainCategory::Spending, "gym"),
    (&["AMAZON", "AMZN", "TARGET"], MainCategory::Spending, "shopping"),
    (
        &["STARBUCKS", "MCDONALD", "CHIPOTLE", "DOORDASH"],
        MainCategory::Spending,
        "eating out",
    ),
    (&["BREWING", "TAVERN", "BAR "], MainCategory::Spending, "alcohol/going out"),
    (&["AMC", "REGAL", "FANDANGO"], MainCategory::Spending, "entertainment"),
    (&["NETFLIX", "SPOTIFY", "HULU"], MainCategory::Spending, "subscriptions"),
    (&["VANGUARD"], MainCategory::Investments, "vanguard roth ira"),
    (&["ROBINHOOD"], MainCategory::Investments, "robinhood"),
    (&["COINBASE"], MainCategory::Investments, "coinbase"),
    (&["ALLY BANK"], MainCategory::Investments, "ally bank"),
];

#[derive(Clone, Debug)]
enum Mode {
    Rules,
    /// Fixed answers keyed by a description substring; unmatched
    /// transactions fall back to the rules
    Scripted(Vec<(String, String)>),
    Failing(String),
}

/// Mock AI backend for testing
#[derive(Clone, Debug)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    mode: Mode,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new rule-based mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            mode: Mode::Rules,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a backend where every classification fails with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            mode: Mode::Failing(reason.to_string()),
            ..Self::new()
        }
    }

    /// Answer `response` verbatim for descriptions containing `needle`
    pub fn with_response(mut self, needle: &str, response: &str) -> Self {
        let entry = (needle.to_uppercase(), response.to_string());
        match &mut self.mode {
            Mode::Scripted(entries) => entries.push(entry),
            _ => self.mode = Mode::Scripted(vec![entry]),
        }
        self
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Number of classification requests served, shared across clones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Answer text the rules produce for a transaction
    fn rule_answer(transaction: &Transaction, taxonomy: &Taxonomy) -> Result<String> {
        if let Some(rule) =
            taxonomy.matching_rule(&transaction.description, transaction.raw_category_str())?
        {
            return Ok(format!("{}: {}", rule.main, rule.subcategory));
        }

        let description = transaction.description.to_uppercase();
        let answer = KEYWORDS
            .iter()
            .find(|(needles, _, _)| needles.iter().any(|n| description.contains(n)))
            .map(|(_, main, sub)| format!("{}: {}", main, sub))
            .unwrap_or_else(|| MainCategory::Unknown.to_string());

        Ok(answer)
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn classify_transaction(
        &self,
        transaction: &Transaction,
        taxonomy: &Taxonomy,
    ) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let answer = match &self.mode {
            Mode::Failing(reason) => return Err(Error::Classification(reason.clone())),
            Mode::Scripted(entries) => {
                let description = transaction.description.to_uppercase();
                match entries.iter().find(|(needle, _)| description.contains(needle)) {
                    Some((_, response)) => response.clone(),
                    None => Self::rule_answer(transaction, taxonomy)?,
                }
            }
            Mode::Rules => Self::rule_answer(transaction, taxonomy)?,
        };

        parse_classification(&answer)
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionDate;
    use rust_decimal::Decimal;

    fn tx(description: &str, raw_category: Option<&str>) -> Transaction {
        Transaction {
            date: TransactionDate::new("01/05/2024", None),
            description: description.to_string(),
            amount: Decimal::new(-1000, 2),
            account: "test".to_string(),
            raw_category: raw_category.map(str::to_string),
            transaction_type: String::new(),
            balance: None,
            source_file: "test.csv".to_string(),
            source_line: 2,
        }
    }

    #[tokio::test]
    async fn test_rules_take_precedence() {
        let backend = MockBackend::new();
        let taxonomy = Taxonomy::default();

        let c = backend
            .classify_transaction(&tx("SAMSCLUB #1234", Some("Shopping")), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Spending);
        assert_eq!(c.subcategory, "groceries");

        let c = backend
            .classify_transaction(&tx("SAMSCLUB #1234", Some("Gas")), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.subcategory, "car");
    }

    #[tokio::test]
    async fn test_keywords_and_unknown() {
        let backend = MockBackend::new();
        let taxonomy = Taxonomy::default();

        let c = backend
            .classify_transaction(&tx("ACME CORP PAYROLL", None), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Incoming);
        assert_eq!(c.subcategory, "work");

        let c = backend
            .classify_transaction(&tx("ZZZ MYSTERY VENDOR", None), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Unknown);
        assert_eq!(c.subcategory, "general");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let backend = MockBackend::new()
            .with_response("coffee", "Spending: eating out")
            .with_response("weird", "not a category");
        let taxonomy = Taxonomy::default();

        let c = backend
            .classify_transaction(&tx("Corner Coffee", None), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.subcategory, "eating out");

        assert!(backend
            .classify_transaction(&tx("WEIRD SHOP", None), &taxonomy)
            .await
            .is_err());

        let c = backend
            .classify_transaction(&tx("NETFLIX.COM", None), &taxonomy)
            .await
            .unwrap();
        assert_eq!(c.subcategory, "subscriptions");
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MockBackend::failing("timeout");
        let result = backend
            .classify_transaction(&tx("NETFLIX.COM", None), &Taxonomy::default())
            .await;
        assert!(matches!(result, Err(Error::Classification(ref r)) if r == "timeout"));
    }

    #[tokio::test]
    async fn test_health() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
