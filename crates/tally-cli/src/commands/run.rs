//! Pipeline command: import, classify, group and export

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use tally_core::ai::{AIBackend, AIClient};
use tally_core::{render_summary, run_pipeline, Classifier, ClassifierConfig, RunOutcome};
use tracing::{info, warn};

use super::{backend_config, load_taxonomy};
use crate::cli::RunArgs;

/// Explicit files if given, otherwise every CSV in `dir` sorted by name
pub fn resolve_inputs(files: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    if !files.is_empty() {
        for file in files {
            if !file.is_file() {
                bail!("Input file not found: {}", file.display());
            }
        }
        return Ok(files.to_vec());
    }

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read input directory {}", dir.display()))?
            .path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            inputs.push(path);
        }
    }

    if inputs.is_empty() {
        bail!("No CSV files found in {}", dir.display());
    }
    inputs.sort();
    Ok(inputs)
}

pub async fn cmd_run(args: &RunArgs) -> Result<()> {
    ensure!(args.concurrency > 0, "--concurrency must be at least 1");

    let inputs = resolve_inputs(&args.files, &args.dir)?;
    let config = backend_config(&args.backend)?;
    let taxonomy = load_taxonomy(args.backend.taxonomy.as_deref())?;

    let client = AIClient::from_config(&config);
    info!(
        backend = %client.kind(),
        model = client.model(),
        host = client.host(),
        "Using AI backend"
    );
    if !client.health_check().await {
        warn!(
            "AI backend at {} is not responding; failed rows will be marked Unknown",
            client.host()
        );
    }

    let classifier = Classifier::new(
        client,
        taxonomy,
        ClassifierConfig {
            concurrency: args.concurrency,
        },
    );

    let outcome = run_pipeline(&inputs, &classifier, &args.output_dir)
        .await
        .context("Pipeline failed")?;

    print_outcome(&outcome, args.quiet);
    Ok(())
}

/// Print the summary, recovered warnings and report location
fn print_outcome(outcome: &RunOutcome, quiet: bool) {
    if !quiet {
        println!("{}", render_summary(&outcome.report));
        println!();
    }

    if !outcome.warnings.is_empty() {
        println!("⚠️  {} warning(s):", outcome.warnings.len());
        for warning in &outcome.warnings {
            println!("   {}", warning);
        }
        println!();
    }

    println!("✅ Report written to {}", outcome.output_path.display());
}

