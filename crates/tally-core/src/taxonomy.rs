//! Budget taxonomy: main categories, their subcategories and merchant
//! disambiguation rules
//!
//! The taxonomy is an immutable value handed to the prompt builder and the
//! AI backends. The built-in default can be replaced by a TOML file:
//!
//! ```toml
//! type_hints = ["ACH_CREDIT is usually incoming"]
//!
//! [[categories]]
//! main = "Spending"
//! subcategories = [{ name = "groceries" }, { name = "car", examples = ["gas", "maint"] }]
//!
//! [[rules]]
//! pattern = "SAMSCLUB"
//! when_category = "gas"
//! main = "Spending"
//! subcategory = "car"
//! note = "'SAMSCLUB' is car (gas, maint) when the category is gas."
//! ```

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::MainCategory;

/// A permitted subcategory with optional example labels for the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategorySpec {
    pub name: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl SubcategorySpec {
    fn new(name: &str, examples: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// `name` or `name (example, example)`
    pub fn label(&self) -> String {
        if self.examples.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.examples.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub main: MainCategory,
    #[serde(default)]
    pub subcategories: Vec<SubcategorySpec>,
}

/// Hard-coded merchant rule
///
/// `pattern` is a case-insensitive regex matched against the description.
/// When `when_category` is set the rule only applies if the raw category
/// contains it (case-insensitive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisambiguationRule {
    pub pattern: String,
    #[serde(default)]
    pub when_category: Option<String>,
    pub main: MainCategory,
    pub subcategory: String,
    /// Sentence placed in the classification prompt
    pub note: String,
    #[serde(skip)]
    compiled: OnceLock<Regex>,
}

impl PartialEq for DisambiguationRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
            && self.when_category == other.when_category
            && self.main == other.main
            && self.subcategory == other.subcategory
            && self.note == other.note
    }
}

impl Eq for DisambiguationRule {}

impl DisambiguationRule {
    pub fn new(
        pattern: &str,
        when_category: Option<&str>,
        main: MainCategory,
        subcategory: &str,
        note: &str,
    ) -> Self {
        Self {
            pattern: pattern.to_string(),
            when_category: when_category.map(str::to_string),
            main,
            subcategory: subcategory.to_string(),
            note: note.to_string(),
            compiled: OnceLock::new(),
        }
    }

    fn build_regex(&self) -> Result<Regex> {
        Ok(RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()?)
    }

    /// Run `f` against the compiled pattern
    ///
    /// The regex is compiled on first use and reused while `pattern` is
    /// unchanged.
    fn with_regex<T>(&self, f: impl FnOnce(&Regex) -> T) -> Result<T> {
        if let Some(re) = self.compiled.get().filter(|re| re.as_str() == self.pattern) {
            return Ok(f(re));
        }
        let re = self.build_regex()?;
        let out = f(&re);
        let _ = self.compiled.set(re);
        Ok(out)
    }

    /// Check whether this rule applies to a description/raw category pair
    pub fn matches(&self, description: &str, raw_category: &str) -> Result<bool> {
        if !self.with_regex(|re| re.is_match(description))? {
            return Ok(false);
        }
        Ok(match &self.when_category {
            Some(cat) => raw_category
                .to_lowercase()
                .contains(&cat.to_lowercase()),
            None => true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<CategorySpec>,
    #[serde(default)]
    pub rules: Vec<DisambiguationRule>,
    /// Free-text hints about source transaction type codes
    #[serde(default)]
    pub type_hints: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        let categories = vec![
            CategorySpec {
                main: MainCategory::Incoming,
                subcategories: vec![
                    SubcategorySpec::new("venmo", &["transfers"]),
                    SubcategorySpec::new("work", &["payroll"]),
                    SubcategorySpec::new("cash", &[]),
                ],
            },
            CategorySpec {
                main: MainCategory::Spending,
                subcategories: vec![
                    SubcategorySpec::new("rent", &[]),
                    SubcategorySpec::new("utilities", &["elec", "wifi"]),
                    SubcategorySpec::new("debt payment", &[]),
                    SubcategorySpec::new("insurance", &["car", "renters", "dr. apt"]),
                    SubcategorySpec::new("car", &["gas", "maint"]),
                    SubcategorySpec::new("groceries", &[]),
                    SubcategorySpec::new("gym", &[]),
                    SubcategorySpec::new("shopping", &[]),
                    SubcategorySpec::new("eating out", &[]),
                    SubcategorySpec::new("alcohol/going out", &[]),
                    SubcategorySpec::new("gifts", &[]),
                    SubcategorySpec::new("entertainment", &["movies"]),
                    SubcategorySpec::new("subscriptions", &[]),
                ],
            },
            CategorySpec {
                main: MainCategory::Investments,
                subcategories: vec![
                    SubcategorySpec::new("vanguard roth ira", &[]),
                    SubcategorySpec::new("robinhood", &[]),
                    SubcategorySpec::new("coinbase", &[]),
                    SubcategorySpec::new("ally bank", &[]),
                ],
            },
            CategorySpec {
                main: MainCategory::Unknown,
                subcategories: Vec::new(),
            },
        ];

        // Order matters: the gas variant must be checked before the generic one.
        let rules = vec![
            DisambiguationRule::new(
                r"SAMSCLUB|SAMS SCAN-N-GO",
                Some("gas"),
                MainCategory::Spending,
                "car",
                "'SAMSCLUB' is car (gas, maint) when the category is gas.",
            ),
            DisambiguationRule::new(
                r"SAMSCLUB|SAMS SCAN-N-GO",
                None,
                MainCategory::Spending,
                "groceries",
                "'SAMSCLUB' and 'SAMS SCAN-N-GO' are usually groceries even though the category is labeled as 'shopping'.",
            ),
            DisambiguationRule::new(
                r"D J\*WSJ|CHE\*CHEGG STUDY",
                None,
                MainCategory::Spending,
                "subscriptions",
                "'D J*WSJ' and 'CHE*CHEGG STUDY' are subscriptions.",
            ),
        ];

        let type_hints = vec![
            "ACH_CREDIT and QUICKPAY_CREDIT are typically incoming transactions.".to_string(),
            "ACH_DEBIT and LOAN_PMT are typically spending or investments.".to_string(),
        ];

        Self {
            categories,
            rules,
            type_hints,
        }
    }
}

impl Taxonomy {
    /// Parse and validate a taxonomy from TOML
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let taxonomy: Taxonomy = toml::from_str(s)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Load a taxonomy override file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Invalid taxonomy file {}: {}", path.display(), e))
        })
    }

    /// Check that every main category appears once and every rule compiles
    pub fn validate(&self) -> Result<()> {
        for main in MainCategory::all() {
            let count = self.categories.iter().filter(|c| c.main == *main).count();
            if count > 1 {
                return Err(Error::Config(format!(
                    "Category {} is listed {} times",
                    main, count
                )));
            }
        }
        for rule in &self.rules {
            rule.with_regex(|_| ())?;
            if rule.subcategory.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Rule '{}' has an empty subcategory",
                    rule.pattern
                )));
            }
        }
        Ok(())
    }

    /// Subcategories permitted under a main category
    pub fn subcategories(&self, main: MainCategory) -> &[SubcategorySpec] {
        self.categories
            .iter()
            .find(|c| c.main == main)
            .map(|c| c.subcategories.as_slice())
            .unwrap_or(&[])
    }

    /// First disambiguation rule matching a transaction
    pub fn matching_rule(
        &self,
        description: &str,
        raw_category: &str,
    ) -> Result<Option<&DisambiguationRule>> {
        for rule in &self.rules {
            if rule.matches(description, raw_category)? {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }
}
