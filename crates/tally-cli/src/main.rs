//! Tally CLI - Budget categorization for bank exports
//!
//! Usage:
//!   tally run                      Classify every CSV in accounts/ and write a report
//!   tally run a.csv b.csv          Classify specific exports
//!   tally detect a.csv             Show the detected export format
//!   tally classify -d "NETFLIX"    Classify one transaction
//!   tally taxonomy --prompt        Show categories and a sample prompt

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Run(args) => commands::cmd_run(&args).await,
        Commands::Detect { files } => commands::cmd_detect(&files),
        Commands::Classify(args) => commands::cmd_classify(&args).await,
        Commands::Taxonomy { file, prompt } => commands::cmd_taxonomy(file.as_deref(), prompt),
    }
}
