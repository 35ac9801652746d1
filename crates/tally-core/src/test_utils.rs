//! Test utilities for tally-core
//!
//! Provides a mock chat server speaking both the OpenAI chat completions
//! API and the Ollama generate API, for exercising the HTTP backends, and a
//! slow in-process backend for exercising classification concurrency.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::{AIBackend, Classification, MockBackend};
use crate::error::Result;
use crate::models::Transaction;
use crate::taxonomy::Taxonomy;

/// Default delay for descriptions without a configured one
const DEFAULT_DELAY: Duration = Duration::from_millis(5);

/// How the mock server answers classification requests
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Pick an answer from keywords in the prompt's description line
    Keywords,
    /// Always answer with this text
    Fixed(String),
    /// HTTP 200 with a body that is not valid JSON
    Malformed,
    /// HTTP 500
    ServerError,
}

struct ServerState {
    reply: MockReply,
    requests: AtomicUsize,
}

/// Mock chat server for tests
pub struct MockChatServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start a keyword-answering server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockReply::Keywords).await
    }

    /// Start a server with a specific reply behavior
    pub async fn start_with(reply: MockReply) -> Self {
        let state = Arc::new(ServerState {
            reply,
            requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of classification requests received
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(json!({ "object": "list", "data": [{ "id": "mock-model", "object": "model" }] }))
}

async fn handle_tags() -> Json<serde_json::Value> {
    Json(json!({ "models": [{ "name": "llama3.2:latest" }] }))
}

/// OpenAI chat completions endpoint
async fn handle_chat(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("");

    match reply_text(&state.reply, prompt) {
        Ok(answer) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": answer },
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        Err(response) => response,
    }
}

/// Ollama generate endpoint
async fn handle_generate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    match reply_text(&state.reply, &request.prompt) {
        Ok(answer) => Json(json!({
            "model": request.model,
            "response": answer,
            "done": true
        }))
        .into_response(),
        Err(response) => response,
    }
}

fn reply_text(reply: &MockReply, prompt: &str) -> std::result::Result<String, Response> {
    match reply {
        MockReply::Keywords => Ok(keyword_answer(prompt).to_string()),
        MockReply::Fixed(answer) => Ok(answer.clone()),
        MockReply::Malformed => Err((StatusCode::OK, "this is not json").into_response()),
        MockReply::ServerError => {
            Err((StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response())
        }
    }
}

/// Extract the description from a classification prompt
fn description_from_prompt(prompt: &str) -> &str {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix("- Description: "))
        .unwrap_or("")
}

fn keyword_answer(prompt: &str) -> &'static str {
    let description = description_from_prompt(prompt).to_uppercase();

    if description.contains("SAMSCLUB") || description.contains("TRADER JOE") {
        "Spending: groceries"
    } else if description.contains("PAYROLL") {
        "Incoming: work"
    } else if description.contains("NETFLIX") {
        "Spending: subscriptions"
    } else if description.contains("VANGUARD") {
        "Investments: vanguard roth ira"
    } else {
        "Unknown"
    }
}

/// Mock backend that answers after a per-description delay
///
/// Tracks how many requests are in flight (and the peak) and the order in
/// which answers complete. Answers come from a wrapped [`MockBackend`].
#[derive(Clone, Default)]
pub struct DelayedBackend {
    inner: MockBackend,
    delays: Vec<(String, Duration)>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    completed: Arc<Mutex<Vec<String>>>,
}

impl DelayedBackend {
    pub fn new(inner: MockBackend) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Delay answers for descriptions containing `needle`
    pub fn with_delay(mut self, needle: &str, delay: Duration) -> Self {
        self.delays.push((needle.to_uppercase(), delay));
        self
    }

    /// Highest number of requests that were in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Descriptions in the order their answers completed
    pub fn completion_order(&self) -> Vec<String> {
        self.completed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn delay_for(&self, description: &str) -> Duration {
        let description = description.to_uppercase();
        self.delays
            .iter()
            .find(|(needle, _)| description.contains(needle))
            .map(|(_, delay)| *delay)
            .unwrap_or(DEFAULT_DELAY)
    }
}

#[async_trait]
impl AIBackend for DelayedBackend {
    async fn classify_transaction(
        &self,
        transaction: &Transaction,
        taxonomy: &Taxonomy,
    ) -> Result<Classification> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay_for(&transaction.description)).await;
        let result = self.inner.classify_transaction(transaction, taxonomy).await;

        if let Ok(mut completed) = self.completed.lock() {
            completed.push(transaction.description.clone());
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        "delayed-mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIBackend, OllamaBackend, OpenAICompatibleBackend};
    use crate::classify::{Classifier, ClassifierConfig};
    use crate::error::Error;
    use crate::models::{MainCategory, Transaction, TransactionDate};
    use crate::taxonomy::Taxonomy;
    use rust_decimal::Decimal;

    fn tx(description: &str) -> Transaction {
        Transaction {
            date: TransactionDate::new("01/05/2024", None),
            description: description.to_string(),
            amount: Decimal::new(-5412, 2),
            account: "chase".to_string(),
            raw_category: None,
            transaction_type: "DEBIT_CARD".to_string(),
            balance: None,
            source_file: "chase.csv".to_string(),
            source_line: 2,
        }
    }

    #[test]
    fn test_description_from_prompt() {
        let prompt = "Transaction Information:\n- Description: SAMSCLUB #1234\n- Amount: -$54.12\n";
        assert_eq!(description_from_prompt(prompt), "SAMSCLUB #1234");
        assert_eq!(keyword_answer(prompt), "Spending: groceries");
        assert_eq!(keyword_answer("nothing here"), "Unknown");
    }

    #[tokio::test]
    async fn test_server_starts_and_stops() {
        let mut server = MockChatServer::start().await;
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert_eq!(server.request_count(), 0);
        server.stop();
    }

    #[tokio::test]
    async fn test_openai_backend_against_mock_server() {
        let server = MockChatServer::start().await;
        let backend = OpenAICompatibleBackend::with_api_key(&server.url(), "mock-model", "sk-test");

        assert!(backend.health_check().await);

        let c = backend
            .classify_transaction(&tx("SAMSCLUB #1234"), &Taxonomy::default())
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Spending);
        assert_eq!(c.subcategory, "groceries");

        let c = backend
            .classify_transaction(&tx("MYSTERY"), &Taxonomy::default())
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Unknown);
        assert_eq!(c.subcategory, "general");
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_ollama_backend_against_mock_server() {
        let server = MockChatServer::start().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        assert!(backend.health_check().await);

        let c = backend
            .classify_transaction(&tx("ACME PAYROLL"), &Taxonomy::default())
            .await
            .unwrap();
        assert_eq!(c.main, MainCategory::Incoming);
        assert_eq!(c.subcategory, "work");
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockChatServer::start_with(MockReply::ServerError).await;
        let backend = OpenAICompatibleBackend::new(&server.url(), "mock-model");

        let result = backend
            .classify_transaction(&tx("SAMSCLUB #1234"), &Taxonomy::default())
            .await;
        match result {
            Err(Error::InvalidData(msg)) => assert!(msg.contains("500")),
            other => panic!("Expected InvalidData error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let server = MockChatServer::start_with(MockReply::Malformed).await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        let result = backend
            .classify_transaction(&tx("SAMSCLUB #1234"), &Taxonomy::default())
            .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_unrecognized_answer_becomes_failure() {
        let server =
            MockChatServer::start_with(MockReply::Fixed("Groceries, probably".to_string())).await;
        let classifier = Classifier::new(
            OpenAICompatibleBackend::new(&server.url(), "mock-model"),
            Taxonomy::default(),
            ClassifierConfig::default(),
        );

        let outcomes = classifier
            .classify_all(&[tx("SAMSCLUB #1234"), tx("ACME PAYROLL")])
            .await;
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert_eq!(outcome.category(), (MainCategory::Unknown, "error"));
        }
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_classification_keeps_order() {
        let server = MockChatServer::start().await;
        let classifier = Classifier::new(
            OpenAICompatibleBackend::new(&server.url(), "mock-model"),
            Taxonomy::default(),
            ClassifierConfig {
                concurrency: 3,
            },
        );

        let descriptions = [
            "NETFLIX.COM",
            "SAMSCLUB #1",
            "ACME PAYROLL",
            "VANGUARD BUY",
            "MYSTERY",
            "TRADER JOE'S",
        ];
        let transactions: Vec<_> = descriptions.iter().map(|d| tx(d)).collect();

        let outcomes = classifier.classify_all(&transactions).await;
        let mains: Vec<_> = outcomes.iter().map(|o| o.category().0).collect();
        assert_eq!(
            mains,
            vec![
                MainCategory::Spending,
                MainCategory::Spending,
                MainCategory::Incoming,
                MainCategory::Investments,
                MainCategory::Unknown,
                MainCategory::Spending,
            ]
        );
        assert_eq!(server.request_count(), 6);
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_input_order() {
        let backend = DelayedBackend::new(MockBackend::new())
            .with_delay("NETFLIX", Duration::from_millis(150))
            .with_delay("PAYROLL", Duration::from_millis(75))
            .with_delay("VANGUARD", Duration::from_millis(0));
        let classifier = Classifier::new(
            backend,
            Taxonomy::default(),
            ClassifierConfig { concurrency: 3 },
        );

        let outcomes = classifier
            .classify_all(&[tx("NETFLIX.COM"), tx("ACME PAYROLL"), tx("VANGUARD BUY")])
            .await;

        assert_eq!(
            classifier.backend().completion_order(),
            vec!["VANGUARD BUY", "ACME PAYROLL", "NETFLIX.COM"]
        );
        let categories: Vec<_> = outcomes.iter().map(|o| o.category()).collect();
        assert_eq!(
            categories,
            vec![
                (MainCategory::Spending, "subscriptions"),
                (MainCategory::Incoming, "work"),
                (MainCategory::Investments, "vanguard roth ira"),
            ]
        );
    }

    #[tokio::test]
    async fn test_in_flight_requests_bounded_by_concurrency() {
        let transactions: Vec<_> = (0..10).map(|i| tx(&format!("STORE {}", i))).collect();

        for concurrency in [1, 3] {
            let classifier = Classifier::new(
                DelayedBackend::new(MockBackend::new())
                    .with_delay("STORE", Duration::from_millis(20)),
                Taxonomy::default(),
                ClassifierConfig { concurrency },
            );

            let outcomes = classifier.classify_all(&transactions).await;
            assert_eq!(outcomes.len(), 10);
            assert_eq!(classifier.backend().peak_in_flight(), concurrency);
            assert_eq!(classifier.backend().completion_order().len(), 10);
        }
    }
}
