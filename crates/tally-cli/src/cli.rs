//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tally - Sort bank exports into a budget summary
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Categorize bank and credit card exports into budget categories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import, classify and export a budget summary
    Run(RunArgs),

    /// Show the detected format of CSV exports without classifying
    Detect {
        /// CSV files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Classify a single ad-hoc transaction
    Classify(ClassifyArgs),

    /// Show the active category taxonomy
    Taxonomy {
        /// Taxonomy override file (TOML)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Also print a sample classification prompt
        #[arg(long)]
        prompt: bool,
    },
}

/// Backend selection shared by commands that call the classifier
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// AI backend: openai, openai_compatible, ollama, mock (overrides AI_BACKEND)
    #[arg(long)]
    pub backend: Option<String>,

    /// Model name (overrides the backend's model variable)
    #[arg(long)]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Taxonomy override file (TOML)
    #[arg(long)]
    pub taxonomy: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// CSV files to process (defaults to every CSV in --dir)
    pub files: Vec<PathBuf>,

    /// Directory scanned for CSV files when none are given
    #[arg(long, default_value = "accounts")]
    pub dir: PathBuf,

    /// Directory the summary report is written to
    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Maximum classification requests in flight
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Don't print the summary to the terminal
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// Transaction description, as it appears in the export
    #[arg(short, long)]
    pub description: String,

    /// Signed amount (negative = outflow)
    #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
    pub amount: String,

    /// Category given by the bank, if any
    #[arg(short, long)]
    pub category: Option<String>,

    /// Transaction type code (ACH_DEBIT, Sale, ...)
    #[arg(short = 't', long = "type", default_value = "")]
    pub transaction_type: String,

    #[command(flatten)]
    pub backend: BackendArgs,
}
