//! End-to-end run: normalize, sort, classify, group, export
//!
//! Only I/O failures on input files or the report are fatal. Everything
//! else is recovered and returned as a [`PipelineWarning`].

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::info;

use crate::aggregate::{sort_by_date, Report, SortOutcome};
use crate::ai::AIBackend;
use crate::classify::Classifier;
use crate::error::Result;
use crate::export::export_report;
use crate::import::normalize_file;
use crate::models::{ClassificationOutcome, ClassifiedTransaction, Transaction};

/// A recovered problem worth showing to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineWarning {
    #[error("{file}:{line}: row skipped: {reason}")]
    RowRejected {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("{file}: header matches no known schema, read with credit mapping")]
    SchemaAmbiguous { file: String },

    #[error("{file}:{line}: could not classify '{description}': {reason}")]
    ClassificationFailed {
        file: String,
        line: u64,
        description: String,
        reason: String,
    },

    #[error("could not sort by date ({unparsed} unparsed, e.g. '{example}'), kept original order")]
    SortSkipped { unparsed: usize, example: String },
}

/// Transactions from every input file, in file order
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub files: Vec<String>,
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<PipelineWarning>,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub output_path: PathBuf,
    pub warnings: Vec<PipelineWarning>,
}

/// Read and normalize every input file
pub fn normalize_inputs(paths: &[PathBuf]) -> Result<NormalizedBatch> {
    let mut batch = NormalizedBatch::default();

    for path in paths {
        let file = normalize_file(path)?;

        if file.detection.ambiguous {
            batch.warnings.push(PipelineWarning::SchemaAmbiguous {
                file: file.file_name.clone(),
            });
        }
        batch
            .warnings
            .extend(file.rejected.into_iter().map(|r| PipelineWarning::RowRejected {
                file: r.file,
                line: r.line,
                reason: r.reason,
            }));

        batch.files.push(file.file_name);
        batch.transactions.extend(file.transactions);
    }

    info!(
        "Processing {} total transactions across {} files",
        batch.transactions.len(),
        batch.files.len()
    );
    Ok(batch)
}

/// Run the pipeline with an explicit report timestamp
pub async fn run_pipeline_at<B: AIBackend>(
    paths: &[PathBuf],
    classifier: &Classifier<B>,
    output_dir: &Path,
    now: NaiveDateTime,
) -> Result<RunOutcome> {
    let NormalizedBatch {
        files,
        mut transactions,
        mut warnings,
    } = normalize_inputs(paths)?;

    if let SortOutcome::Skipped { unparsed, example } = sort_by_date(&mut transactions) {
        warnings.push(PipelineWarning::SortSkipped { unparsed, example });
    }

    let outcomes = classifier.classify_all(&transactions).await;

    let classified: Vec<ClassifiedTransaction> = transactions
        .into_iter()
        .zip(outcomes)
        .map(|(tx, outcome)| {
            if let ClassificationOutcome::Failure { reason } = &outcome {
                warnings.push(PipelineWarning::ClassificationFailed {
                    file: tx.source_file.clone(),
                    line: tx.source_line,
                    description: tx.description.clone(),
                    reason: reason.clone(),
                });
            }
            ClassifiedTransaction::new(tx, &outcome)
        })
        .collect();

    let report = Report::build(files, classified);
    let output_path = export_report(&report, output_dir, now)?;

    Ok(RunOutcome {
        report,
        output_path,
        warnings,
    })
}

/// Run the pipeline, stamping the report with the local time
pub async fn run_pipeline<B: AIBackend>(
    paths: &[PathBuf],
    classifier: &Classifier<B>,
    output_dir: &Path,
) -> Result<RunOutcome> {
    run_pipeline_at(paths, classifier, output_dir, Local::now().naive_local()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::classify::ClassifierConfig;
    use crate::error::Error;
    use crate::models::MainCategory;
    use crate::taxonomy::Taxonomy;
    use rust_decimal::Decimal;
    use std::fs;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn classifier(backend: MockBackend) -> Classifier<MockBackend> {
        Classifier::new(backend, Taxonomy::default(), ClassifierConfig::default())
    }

    #[tokio::test]
    async fn test_checking_row_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let input = write(
            tmp.path(),
            "chase_checking.csv",
            "Details,Posting Date,Description,Amount,Type,Balance\n\
             DEBIT,01/05/2024,SAMSCLUB #1234,-54.12,DEBIT_CARD,100.00\n",
        );

        let outcome = run_pipeline(&[input], &classifier(MockBackend::new()), &tmp.path().join("out"))
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        let spending = outcome.report.buckets.get(MainCategory::Spending).unwrap();
        assert_eq!(spending.subcategories[0].name, "groceries");
        assert_eq!(
            outcome.report.grand_total(),
            Decimal::from_str("-54.12").unwrap()
        );

        let csv = fs::read_to_string(&outcome.output_path).unwrap();
        assert!(csv.contains(",== Spending: groceries ==,$54.12,,,Spending,groceries"));
        assert!(csv.contains(",=== OVERALL TOTAL ===,-$54.12,,,TOTAL,TOTAL"));
    }

    #[tokio::test]
    async fn test_warnings_are_collected() {
        let tmp = TempDir::new().unwrap();
        let card = write(
            tmp.path(),
            "card_2024.csv",
            "Transaction Date,Description,Category,Amount\n\
             01/02/2024,NETFLIX.COM,Entertainment,-15.99\n\
             01/03/2024,BROKEN,Shopping,N/A\n\
             01/01/2024,GLITCH STORE,Shopping,-3.00\n",
        );
        let odd = write(
            tmp.path(),
            "odd.csv",
            "Date,Description,Amount\n01/04/2024,VENMO CASHOUT,25.00\n",
        );

        let backend = MockBackend::new().with_response("GLITCH", "???");
        let outcome = run_pipeline(&[card, odd], &classifier(backend), tmp.path())
            .await
            .unwrap();

        assert!(outcome.warnings.contains(&PipelineWarning::SchemaAmbiguous {
            file: "odd.csv".to_string()
        }));
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::RowRejected { file, line: 3, .. } if file == "card_2024.csv"
        )));
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::SortSkipped { unparsed: 1, .. }
        )));
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::ClassificationFailed { description, .. } if description == "GLITCH STORE"
        )));

        assert_eq!(outcome.report.files, vec!["card_2024.csv", "odd.csv"]);
        assert_eq!(outcome.report.buckets.transaction_count(), 3);
        let unknown = outcome.report.buckets.get(MainCategory::Unknown).unwrap();
        assert_eq!(unknown.subcategories[0].name, "error");
        assert_eq!(
            outcome.report.grand_total(),
            Decimal::from_str("6.01").unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = run_pipeline(
            &[tmp.path().join("missing.csv")],
            &classifier(MockBackend::new()),
            tmp.path(),
        )
        .await;
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_warning_display() {
        let w = PipelineWarning::RowRejected {
            file: "card.csv".to_string(),
            line: 3,
            reason: "Import error: Unable to parse amount: 'N/A'".to_string(),
        };
        assert_eq!(
            w.to_string(),
            "card.csv:3: row skipped: Import error: Unable to parse amount: 'N/A'"
        );
    }
}
