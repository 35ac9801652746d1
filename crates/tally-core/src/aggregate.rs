//! Date sorting, category grouping and totals
//!
//! Buckets keep first-seen order for both categories and subcategories.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::{ClassifiedTransaction, MainCategory, Transaction};

/// Result of [`sort_by_date`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    Sorted,
    /// At least one date did not parse; the batch kept its original order
    Skipped {
        unparsed: usize,
        /// First offending date text, for the warning message
        example: String,
    },
}

/// Sort transactions by date ascending
///
/// Stable, and all-or-nothing: if any date failed to parse, nothing moves.
pub fn sort_by_date(transactions: &mut [Transaction]) -> SortOutcome {
    let unparsed: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| !t.date.is_parsed())
        .collect();

    if let Some(first) = unparsed.first() {
        let outcome = SortOutcome::Skipped {
            unparsed: unparsed.len(),
            example: first.date.raw.clone(),
        };
        warn!(
            unparsed = unparsed.len(),
            "Could not sort all transactions by date, keeping original order"
        );
        return outcome;
    }

    transactions.sort_by_key(|t| t.date.parsed);
    SortOutcome::Sorted
}

/// Transactions sharing a main category and subcategory
#[derive(Debug, Clone, PartialEq)]
pub struct SubcategoryGroup {
    pub name: String,
    pub transactions: Vec<ClassifiedTransaction>,
}

impl SubcategoryGroup {
    /// Exact signed sum of the group's amounts
    pub fn total(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub main: MainCategory,
    pub subcategories: Vec<SubcategoryGroup>,
}

impl CategoryGroup {
    pub fn total(&self) -> Decimal {
        self.subcategories.iter().map(|s| s.total()).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.subcategories.iter().map(|s| s.transactions.len()).sum()
    }
}

/// Two-level grouping: main category, then subcategory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBuckets {
    groups: Vec<CategoryGroup>,
}

impl CategoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction to its (main, subcategory) bucket, creating the
    /// bucket at the end if this is the first time the key is seen
    pub fn insert(&mut self, transaction: ClassifiedTransaction) {
        let group_idx = match self
            .groups
            .iter()
            .position(|g| g.main == transaction.main_category)
        {
            Some(idx) => idx,
            None => {
                self.groups.push(CategoryGroup {
                    main: transaction.main_category,
                    subcategories: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[group_idx];

        match group
            .subcategories
            .iter_mut()
            .find(|s| s.name == transaction.subcategory)
        {
            Some(sub) => sub.transactions.push(transaction),
            None => group.subcategories.push(SubcategoryGroup {
                name: transaction.subcategory.clone(),
                transactions: vec![transaction],
            }),
        }
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn get(&self, main: MainCategory) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.main == main)
    }

    /// Grand total: sum of every category total
    pub fn total(&self) -> Decimal {
        self.groups.iter().map(|g| g.total()).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.groups.iter().map(|g| g.transaction_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<ClassifiedTransaction> for CategoryBuckets {
    fn from_iter<I: IntoIterator<Item = ClassifiedTransaction>>(iter: I) -> Self {
        let mut buckets = CategoryBuckets::new();
        for transaction in iter {
            buckets.insert(transaction);
        }
        buckets
    }
}

/// Grouped results of one run, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Input file names, in processing order
    pub files: Vec<String>,
    pub buckets: CategoryBuckets,
}

impl Report {
    /// Group classified transactions in arrival order
    pub fn build<I>(files: Vec<String>, transactions: I) -> Self
    where
        I: IntoIterator<Item = ClassifiedTransaction>,
    {
        let buckets: CategoryBuckets = transactions.into_iter().collect();
        info!(
            "Grouped {} transactions into {} categories",
            buckets.transaction_count(),
            buckets.groups().len()
        );
        Self { files, buckets }
    }

    pub fn grand_total(&self) -> Decimal {
        self.buckets.total()
    }
}
