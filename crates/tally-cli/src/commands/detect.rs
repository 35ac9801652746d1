//! Export format detection

use std::path::PathBuf;

use anyhow::{Context, Result};
use tally_core::{normalize_file, NormalizedFile};

/// Human-readable description of one normalized file
pub fn describe_file(file: &NormalizedFile) -> Vec<String> {
    let format = if file.detection.ambiguous {
        format!("{} (header not recognized, read as credit)", file.detection.schema)
    } else {
        file.detection.schema.to_string()
    };

    let mut lines = vec![
        format!("📄 {}", file.file_name),
        format!("   Format:  {}", format),
        format!("   Account: {}", file.account),
        format!(
            "   Rows:    {} accepted, {} rejected",
            file.transactions.len(),
            file.rejected.len()
        ),
    ];
    for row in &file.rejected {
        lines.push(format!("     line {}: {}", row.line, row.reason));
    }
    lines
}

pub fn cmd_detect(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let file = normalize_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for line in describe_file(&file) {
            println!("{}", line);
        }
        println!();
    }
    Ok(())
}
