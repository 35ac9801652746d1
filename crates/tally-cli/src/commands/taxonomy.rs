//! Taxonomy display

use std::path::Path;

use anyhow::Result;
use rust_decimal::Decimal;
use tally_core::models::{Transaction, TransactionDate};
use tally_core::prompts::{classification_prompt, SYSTEM_PROMPT};
use tally_core::Taxonomy;

use super::load_taxonomy;

/// Lines listing categories, merchant rules and type hints
pub fn describe_taxonomy(taxonomy: &Taxonomy) -> Vec<String> {
    let mut lines = vec!["Categories:".to_string()];
    for category in &taxonomy.categories {
        lines.push(format!("  {}", category.main));
        if category.subcategories.is_empty() {
            lines.push("    (no subcategories)".to_string());
        }
        for sub in &category.subcategories {
            lines.push(format!("    - {}", sub.label()));
        }
    }

    if !taxonomy.rules.is_empty() {
        lines.push(String::new());
        lines.push("Merchant rules (first match wins):".to_string());
        for rule in &taxonomy.rules {
            let condition = rule
                .when_category
                .as_deref()
                .map(|c| format!(" when category contains '{}'", c))
                .unwrap_or_default();
            lines.push(format!(
                "  /{}/{} → {}: {}",
                rule.pattern, condition, rule.main, rule.subcategory
            ));
        }
    }

    if !taxonomy.type_hints.is_empty() {
        lines.push(String::new());
        lines.push("Type hints:".to_string());
        for hint in &taxonomy.type_hints {
            lines.push(format!("  {}", hint));
        }
    }

    lines
}

fn sample_transaction() -> Transaction {
    Transaction {
        date: TransactionDate::new("01/05/2024", None),
        description: "SAMSCLUB #1234".to_string(),
        amount: Decimal::new(-5412, 2),
        account: "sample".to_string(),
        raw_category: Some("Shopping".to_string()),
        transaction_type: "Sale".to_string(),
        balance: None,
        source_file: String::new(),
        source_line: 0,
    }
}

pub fn cmd_taxonomy(file: Option<&Path>, show_prompt: bool) -> Result<()> {
    let taxonomy = load_taxonomy(file)?;

    for line in describe_taxonomy(&taxonomy) {
        println!("{}", line);
    }

    if show_prompt {
        println!();
        println!("Sample prompt:");
        println!("{}", "-".repeat(60));
        println!("[system] {}", SYSTEM_PROMPT);
        println!();
        println!("{}", classification_prompt(&sample_transaction(), &taxonomy));
        println!("{}", "-".repeat(60));
    }

    Ok(())
}
