//! CLI command implementations
//!
//! Commands are organized by task:
//! - `run` - Full import, classify and export pipeline
//! - `detect` - Export format detection without classifying
//! - `classify` - One-off classification against the configured backend
//! - `taxonomy` - Show the active category taxonomy

pub mod classify;
pub mod detect;
pub mod run;
pub mod taxonomy;

// Re-export command functions for main.rs
pub use classify::*;
pub use detect::*;
pub use run::*;
pub use taxonomy::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tally_core::ai::{BackendConfig, BackendKind};
use tally_core::Taxonomy;

use crate::cli::BackendArgs;

/// Backend settings from the environment with CLI flags applied on top
pub fn backend_config(args: &BackendArgs) -> Result<BackendConfig> {
    backend_config_from(args, |key| std::env::var(key).ok())
}

/// Same as [`backend_config`] with an injectable environment lookup
pub fn backend_config_from<F>(args: &BackendArgs, get: F) -> Result<BackendConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = &args.backend {
        name.parse::<BackendKind>().map_err(anyhow::Error::msg)?;
    }

    let mut config = BackendConfig::from_vars(|key| match (key, &args.backend) {
        ("AI_BACKEND", Some(name)) => Some(name.clone()),
        _ => get(key),
    });

    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }
    if let Some(secs) = args.timeout_secs {
        if secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }
        config.timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

/// Load a taxonomy override, or the built-in taxonomy
pub fn load_taxonomy(path: Option<&Path>) -> Result<Taxonomy> {
    match path {
        Some(path) => Taxonomy::load(path)
            .with_context(|| format!("Failed to load taxonomy from {}", path.display())),
        None => Ok(Taxonomy::default()),
    }
}
