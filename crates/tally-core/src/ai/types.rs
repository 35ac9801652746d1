//! Types shared by the AI backends

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{ClassificationOutcome, MainCategory};

/// Default per-request timeout for HTTP backends
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Parsed classifier answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub main: MainCategory,
    pub subcategory: String,
}

impl Classification {
    pub fn into_outcome(self) -> ClassificationOutcome {
        ClassificationOutcome::success(self.main, self.subcategory)
    }
}

/// Which backend implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAICompatible,
    Ollama,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAICompatible => "openai_compatible",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai_compatible" | "vllm" | "localai" | "llamacpp" => {
                Ok(Self::OpenAICompatible)
            }
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(format!("Unknown AI backend: {}", other)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend settings gathered from the environment and CLI flags
///
/// `host` and `model` left as `None` fall back to the backend defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub host: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::OpenAICompatible,
            host: None,
            model: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BackendConfig {
    /// Read configuration from process environment variables
    ///
    /// - `AI_BACKEND`: openai (default), openai_compatible, ollama, mock
    /// - `OPENAI_COMPATIBLE_HOST`, `OPENAI_COMPATIBLE_MODEL`
    /// - `OPENAI_COMPATIBLE_API_KEY`, falling back to `OPENAI_API_KEY`
    /// - `OLLAMA_HOST`, `OLLAMA_MODEL`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`BackendConfig::from_env`] with an injectable lookup
    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let kind = match var("AI_BACKEND") {
            Some(name) => name.parse().unwrap_or_else(|_| {
                warn!(backend = %name, "Unknown AI_BACKEND, falling back to openai");
                BackendKind::OpenAICompatible
            }),
            None => BackendKind::OpenAICompatible,
        };

        let (host, model, api_key) = match kind {
            BackendKind::OpenAICompatible => (
                var("OPENAI_COMPATIBLE_HOST"),
                var("OPENAI_COMPATIBLE_MODEL"),
                var("OPENAI_COMPATIBLE_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            ),
            BackendKind::Ollama => (var("OLLAMA_HOST"), var("OLLAMA_MODEL"), None),
            BackendKind::Mock => (None, None, None),
        };

        Self {
            kind,
            host,
            model,
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!(
            "OpenAI".parse::<BackendKind>().unwrap(),
            BackendKind::OpenAICompatible
        );
        assert_eq!("ollama".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Mock);
        assert!("anthropic".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_config_defaults_to_openai() {
        let config = BackendConfig::from_vars(lookup(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.kind, BackendKind::OpenAICompatible);
        assert_eq!(config.api_key, Some("sk-test".to_string()));
        assert_eq!(config.host, None);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_config_compatible_key_wins() {
        let config = BackendConfig::from_vars(lookup(&[
            ("OPENAI_API_KEY", "sk-fallback"),
            ("OPENAI_COMPATIBLE_API_KEY", "sk-primary"),
            ("OPENAI_COMPATIBLE_HOST", "http://localhost:8000"),
        ]));
        assert_eq!(config.api_key, Some("sk-primary".to_string()));
        assert_eq!(config.host, Some("http://localhost:8000".to_string()));
    }

    #[test]
    fn test_config_ollama() {
        let config = BackendConfig::from_vars(lookup(&[
            ("AI_BACKEND", "ollama"),
            ("OLLAMA_HOST", "http://localhost:11434"),
            ("OLLAMA_MODEL", "gemma3"),
            ("OPENAI_API_KEY", "sk-ignored"),
        ]));
        assert_eq!(config.kind, BackendKind::Ollama);
        assert_eq!(config.model, Some("gemma3".to_string()));
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_config_unknown_backend_falls_back() {
        let config = BackendConfig::from_vars(lookup(&[("AI_BACKEND", "carrier-pigeon")]));
        assert_eq!(config.kind, BackendKind::OpenAICompatible);
    }

    #[test]
    fn test_classification_into_outcome() {
        let c = Classification {
            main: MainCategory::Spending,
            subcategory: String::new(),
        };
        assert_eq!(
            c.into_outcome().category(),
            (MainCategory::Spending, "general")
        );
    }
}
