//! Tally Core Library
//!
//! Budget categorization pipeline for bank and credit card exports:
//! - CSV import with checking/credit schema detection
//! - Taxonomy of budget categories and merchant rules
//! - Pluggable AI backends (OpenAI-compatible, Ollama, mock)
//! - Bounded-concurrency batch classification
//! - Category grouping with exact decimal totals
//! - Summary report export

pub mod aggregate;
pub mod ai;
pub mod classify;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod taxonomy;

/// Test utilities including a mock chat server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{
    sort_by_date, CategoryBuckets, CategoryGroup, Report, SortOutcome, SubcategoryGroup,
};
pub use ai::{
    AIBackend, AIClient, BackendConfig, BackendKind, Classification, MockBackend, OllamaBackend,
    OpenAICompatibleBackend,
};
pub use classify::{Classifier, ClassifierConfig};
pub use error::{Error, Result};
pub use export::{export_report, render_summary, report_rows, write_report_csv, ReportRow};
pub use import::{normalize_file, normalize_reader, NormalizedFile, RowError, SchemaDetection};
pub use models::{
    ClassificationOutcome, ClassifiedTransaction, MainCategory, SourceSchema, Transaction,
    TransactionDate,
};
pub use pipeline::{run_pipeline, run_pipeline_at, PipelineWarning, RunOutcome};
pub use taxonomy::Taxonomy;
