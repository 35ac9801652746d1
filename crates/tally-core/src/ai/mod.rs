//! Pluggable AI backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: the classification interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = AIClient::from_env();
//! let classification = client
//!     .classify_transaction(&transaction, &Taxonomy::default())
//!     .await?;
//! println!("{}: {}", classification.main, classification.subcategory);
//! ```
//!
//! # Configuration
//!
//! See [`BackendConfig::from_env`] for the environment variables.

mod mock;
pub mod ollama;
pub mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Transaction;
use crate::taxonomy::Taxonomy;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Classify one transaction against the taxonomy
    async fn classify_transaction(
        &self,
        transaction: &Transaction,
        taxonomy: &Taxonomy,
    ) -> Result<Classification>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI or any server with the chat completions API
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    pub fn from_env() -> Self {
        Self::from_config(&BackendConfig::from_env())
    }

    /// Create an AI client from explicit settings
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = match config.kind {
            BackendKind::OpenAICompatible => {
                AIClient::OpenAICompatible(OpenAICompatibleBackend::from_parts(
                    config.host.as_deref(),
                    config.model.as_deref(),
                    config.api_key.as_deref(),
                ))
            }
            BackendKind::Ollama => AIClient::Ollama(OllamaBackend::from_parts(
                config.host.as_deref(),
                config.model.as_deref(),
            )),
            BackendKind::Mock => AIClient::Mock(MockBackend::new()),
        };
        client.with_timeout(config.timeout)
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str) -> Self {
        AIClient::OpenAICompatible(OpenAICompatibleBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Create a new instance with a different per-request timeout
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_timeout(timeout)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_timeout(timeout)),
            AIClient::Mock(b) => AIClient::Mock(b.clone()),
        }
    }

    /// Short backend name for display
    pub fn kind(&self) -> BackendKind {
        match self {
            AIClient::OpenAICompatible(_) => BackendKind::OpenAICompatible,
            AIClient::Ollama(_) => BackendKind::Ollama,
            AIClient::Mock(_) => BackendKind::Mock,
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn classify_transaction(
        &self,
        transaction: &Transaction,
        taxonomy: &Taxonomy,
    ) -> Result<Classification> {
        match self {
            AIClient::OpenAICompatible(b) => b.classify_transaction(transaction, taxonomy).await,
            AIClient::Ollama(b) => b.classify_transaction(transaction, taxonomy).await,
            AIClient::Mock(b) => b.classify_transaction(transaction, taxonomy).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
