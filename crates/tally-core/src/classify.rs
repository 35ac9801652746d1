//! Batch classification with bounded concurrency

use futures_util::{stream, StreamExt};
use tracing::{debug, info, warn};

use crate::ai::AIBackend;
use crate::models::{ClassificationOutcome, Transaction};
use crate::taxonomy::Taxonomy;

/// Default number of in-flight classification requests
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Maximum in-flight requests; values below 1 are treated as 1
    pub concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Classifies transactions through an AI backend
///
/// Backend errors never escape: they become [`ClassificationOutcome::Failure`].
pub struct Classifier<B: AIBackend> {
    backend: B,
    taxonomy: Taxonomy,
    config: ClassifierConfig,
}

impl<B: AIBackend> Classifier<B> {
    pub fn new(backend: B, taxonomy: Taxonomy, config: ClassifierConfig) -> Self {
        Self {
            backend,
            taxonomy,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Classify a single transaction
    pub async fn classify_one(&self, transaction: &Transaction) -> ClassificationOutcome {
        match self
            .backend
            .classify_transaction(transaction, &self.taxonomy)
            .await
        {
            Ok(classification) => {
                debug!(
                    description = %transaction.description,
                    "Classified as {}: {}",
                    classification.main,
                    classification.subcategory
                );
                classification.into_outcome()
            }
            Err(e) => {
                warn!(
                    description = %transaction.description,
                    file = %transaction.source_file,
                    line = transaction.source_line,
                    "Classification failed: {}",
                    e
                );
                ClassificationOutcome::failure(e.to_string())
            }
        }
    }

    /// Classify every transaction, returning outcomes in input order
    pub async fn classify_all(&self, transactions: &[Transaction]) -> Vec<ClassificationOutcome> {
        let total = transactions.len();
        info!(
            "Classifying {} transactions with {} ({}, concurrency {})",
            total,
            self.backend.model(),
            self.backend.host(),
            self.concurrency()
        );

        let mut slots: Vec<Option<ClassificationOutcome>> = vec![None; total];

        let mut results = stream::iter(transactions.iter().enumerate())
            .map(|(index, tx)| async move { (index, self.classify_one(tx).await) })
            .buffer_unordered(self.concurrency());

        let mut done = 0;
        while let Some((index, outcome)) = results.next().await {
            done += 1;
            debug!("Processed transaction {}/{}", done, total);
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| ClassificationOutcome::failure("No result recorded"))
            })
            .collect()
    }
}
