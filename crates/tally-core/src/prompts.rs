//! Classification prompt
//!
//! The prompt is rendered from the active [`Taxonomy`] so an override file
//! changes what the model is asked without touching the backends.

use crate::models::{format_signed, MainCategory, Transaction};
use crate::taxonomy::Taxonomy;

/// System message sent alongside every classification prompt
pub const SYSTEM_PROMPT: &str = "You are a financial categorization assistant.";

fn join_with_or(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}

fn category_lines(taxonomy: &Taxonomy) -> Vec<String> {
    taxonomy
        .categories
        .iter()
        .map(|cat| {
            let labels: Vec<String> = cat.subcategories.iter().map(|s| s.label()).collect();
            if labels.is_empty() {
                format!("- {}: if it doesn't match any above", cat.main)
            } else {
                format!("- {}: {}", cat.main, join_with_or(&labels))
            }
        })
        .collect()
}

/// Up to two `"Main: sub"` answer examples drawn from the taxonomy
fn answer_examples(taxonomy: &Taxonomy) -> String {
    let mut examples: Vec<String> = Vec::new();
    for main in [MainCategory::Spending, MainCategory::Incoming] {
        if let Some(sub) = taxonomy.subcategories(main).first() {
            examples.push(format!("\"{}: {}\"", main, sub.name));
        }
    }
    if examples.is_empty() {
        examples.push("\"Unknown: general\"".to_string());
    }
    examples.join(" or ")
}

/// Render the user prompt for one transaction
///
/// Output depends only on the transaction and the taxonomy.
pub fn classification_prompt(tx: &Transaction, taxonomy: &Taxonomy) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Based on the transaction description, amount, and existing category (if any),\n\
         classify this transaction into one of the following budget categories:\n\n",
    );
    for line in category_lines(taxonomy) {
        prompt.push_str(&line);
        prompt.push('\n');
    }

    prompt.push_str("\nTransaction Information:\n");
    prompt.push_str(&format!("- Description: {}\n", tx.description));
    prompt.push_str(&format!("- Amount: {}\n", format_signed(tx.amount)));
    prompt.push_str(&format!("- Existing Category: {}\n", tx.raw_category_str()));
    prompt.push_str(&format!("- Transaction Type: {}\n", tx.transaction_type));

    if !taxonomy.type_hints.is_empty() {
        prompt.push('\n');
        prompt.push_str(&taxonomy.type_hints.join("\n"));
        prompt.push('\n');
    }

    if !taxonomy.rules.is_empty() {
        prompt.push('\n');
        let notes: Vec<&str> = taxonomy.rules.iter().map(|r| r.note.as_str()).collect();
        prompt.push_str(&notes.join(" "));
        prompt.push('\n');
    }

    let mains: Vec<String> = taxonomy
        .categories
        .iter()
        .map(|c| c.main.to_string())
        .collect();
    prompt.push_str(&format!(
        "\nReturn only the budget category ({}) followed by a colon and the specific subcategory.\n",
        join_with_or(&mains)
    ));
    prompt.push_str(&format!("Example: {}\n", answer_examples(taxonomy)));

    prompt
}
