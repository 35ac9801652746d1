//! One-off classification of an ad-hoc transaction

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tally_core::ai::{AIBackend, AIClient, Classification};
use tally_core::import::parse_amount;
use tally_core::models::{format_signed, Transaction, TransactionDate};
use tally_core::Taxonomy;

use super::{backend_config, load_taxonomy};
use crate::cli::ClassifyArgs;

/// Build the transaction described by the command-line arguments
pub fn adhoc_transaction(args: &ClassifyArgs) -> Result<Transaction> {
    let amount: Decimal = parse_amount(&args.amount)
        .with_context(|| format!("Invalid --amount '{}'", args.amount))?;

    Ok(Transaction {
        date: TransactionDate::new("", None),
        description: args.description.trim().to_string(),
        amount,
        account: "adhoc".to_string(),
        raw_category: args.category.clone().filter(|c| !c.trim().is_empty()),
        transaction_type: args.transaction_type.clone(),
        balance: None,
        source_file: String::new(),
        source_line: 0,
    })
}

/// Classify one transaction with any backend
pub async fn classify_with<B: AIBackend>(
    backend: &B,
    transaction: &Transaction,
    taxonomy: &Taxonomy,
) -> Result<Classification> {
    backend
        .classify_transaction(transaction, taxonomy)
        .await
        .with_context(|| {
            format!(
                "Classification failed ({} at {})",
                backend.model(),
                backend.host()
            )
        })
}

pub async fn cmd_classify(args: &ClassifyArgs) -> Result<()> {
    let transaction = adhoc_transaction(args)?;
    let config = backend_config(&args.backend)?;
    let taxonomy = load_taxonomy(args.backend.taxonomy.as_deref())?;
    let client = AIClient::from_config(&config);

    println!(
        "🔍 Classifying with {} ({})...\n",
        client.kind(),
        client.model()
    );

    let classification = classify_with(&client, &transaction, &taxonomy).await?;
    println!(
        "  \"{}\" ({}) → {}: {}",
        transaction.description,
        format_signed(transaction.amount),
        classification.main,
        classification.subcategory
    );
    Ok(())
}
