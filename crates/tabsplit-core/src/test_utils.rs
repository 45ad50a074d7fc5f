//! Test utilities for tabsplit-core
//!
//! Mock collaborator servers for development and integration tests:
//! - `MockAiServer` speaks the Ollama and OpenAI chat-completions protocols
//! - `MockOcrServer` speaks the OCR sidecar protocol (`POST /v1/ocr`)
//!
//! Both bind an ephemeral port on 127.0.0.1 and shut down on drop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Structured answer for the `joes.jpg` sample document
pub const JOES_DINER_JSON: &str = r#"{
  "restaurantName": "Joe's Diner",
  "restaurantAddress": null,
  "date": "2024-01-15",
  "items": [
    {"name": "Burger", "quantity": 1, "price": 12.00},
    {"name": "Soda", "quantity": 2, "price": 2.50}
  ],
  "subtotal": 17.00,
  "tax": 1.70,
  "tip": 0,
  "total": 18.70,
  "confidence": 93
}"#;

/// Bucket and key served by `MockOcrServer::start()`
pub const SAMPLE_BUCKET: &str = "receipts";
pub const SAMPLE_KEY: &str = "joes.jpg";

/// OCR lines for the sample document
pub fn joes_diner_lines() -> Vec<(String, f64)> {
    [
        ("JOE'S DINER", 95.0),
        ("01/15/2024", 90.0),
        ("Burger 12.00", 92.0),
        ("2 x Soda 5.00", 88.0),
        ("Subtotal 17.00", 93.0),
        ("Tax 1.70", 91.0),
        ("Total 18.70", 94.0),
    ]
    .into_iter()
    .map(|(t, c)| (t.to_string(), c))
    .collect()
}

/// Running server handle shared by both mocks
struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    async fn spawn(app: Router) -> Self {
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
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ========== Mock LLM ==========

struct AiState {
    reply: String,
    status: StatusCode,
    requests: AtomicUsize,
    last_prompt: std::sync::Mutex<Option<String>>,
}

/// Mock LLM server for testing and development
pub struct MockAiServer {
    handle: ServerHandle,
    state: Arc<AiState>,
}

impl MockAiServer {
    /// Start a server that answers every completion with `JOES_DINER_JSON`
    pub async fn start() -> Self {
        Self::start_with_reply(JOES_DINER_JSON).await
    }

    /// Start a server that answers every completion with `reply` verbatim
    pub async fn start_with_reply(reply: impl Into<String>) -> Self {
        Self::start_inner(reply.into(), StatusCode::OK).await
    }

    /// Start a server that fails every completion with `status`
    pub async fn start_with_status(status: StatusCode) -> Self {
        Self::start_inner(String::new(), status).await
    }

    async fn start_inner(reply: String, status: StatusCode) -> Self {
        let state = Arc::new(AiState {
            reply,
            status,
            requests: AtomicUsize::new(0),
            last_prompt: std::sync::Mutex::new(None),
        });

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/health", get(handle_health))
            .with_state(state.clone());

        Self {
            handle: ServerHandle::spawn(app).await,
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.handle.url()
    }

    /// Number of completion requests received
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// User prompt of the most recent completion request
    pub fn last_prompt(&self) -> Option<String> {
        self.state.last_prompt.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.handle.stop();
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

fn record(state: &AiState, prompt: String) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    *state.last_prompt.lock().unwrap() = Some(prompt);
    if state.status.is_success() {
        None
    } else {
        Some((state.status, "mock failure").into_response())
    }
}

/// Ollama generate endpoint
async fn handle_generate(
    State(state): State<Arc<AiState>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if let Some(err) = record(&state, request.prompt) {
        return err;
    }
    Json(GenerateResponse {
        model: request.model,
        response: state.reply.clone(),
        done: true,
    })
    .into_response()
}

/// OpenAI chat completions endpoint
async fn handle_chat(State(state): State<Arc<AiState>>, Json(request): Json<Value>) -> Response {
    let prompt = request["messages"]
        .as_array()
        .and_then(|msgs| msgs.iter().rev().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();

    if let Some(err) = record(&state, prompt) {
        return err;
    }
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.reply},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Ollama tags endpoint (health check)
async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{
            "name": "llama3.2:latest",
            "modified_at": "2024-01-01T00:00:00Z",
            "size": 4_000_000_000u64
        }]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "mock-model", "object": "model"}]}))
}

async fn handle_health() -> &'static str {
    "ok"
}

// ========== Mock OCR ==========

struct OcrState {
    documents: HashMap<String, Vec<(String, f64)>>,
    status: StatusCode,
}

/// Mock OCR sidecar for testing and development
pub struct MockOcrServer {
    handle: ServerHandle,
}

impl MockOcrServer {
    /// Start a server that knows only `receipts/joes.jpg`
    pub async fn start() -> Self {
        let mut documents = HashMap::new();
        documents.insert(format!("{}/{}", SAMPLE_BUCKET, SAMPLE_KEY), joes_diner_lines());
        Self::start_with_documents(documents).await
    }

    /// Start a server serving `documents`, keyed by `bucket/key`
    pub async fn start_with_documents(documents: HashMap<String, Vec<(String, f64)>>) -> Self {
        Self::start_inner(documents, StatusCode::OK).await
    }

    /// Start a server that fails every request with `status`
    pub async fn start_with_status(status: StatusCode) -> Self {
        Self::start_inner(HashMap::new(), status).await
    }

    async fn start_inner(
        documents: HashMap<String, Vec<(String, f64)>>,
        status: StatusCode,
    ) -> Self {
        let state = Arc::new(OcrState { documents, status });
        let app = Router::new()
            .route("/v1/ocr", post(handle_ocr))
            .route("/health", get(handle_health))
            .with_state(state);

        Self {
            handle: ServerHandle::spawn(app).await,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.handle.url()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.handle.stop();
    }
}

#[derive(Debug, Deserialize)]
struct OcrRequest {
    bucket: String,
    key: String,
}

async fn handle_ocr(
    State(state): State<Arc<OcrState>>,
    Json(request): Json<OcrRequest>,
) -> Response {
    if !state.status.is_success() {
        return (state.status, "mock failure").into_response();
    }

    let path = format!("{}/{}", request.bucket, request.key);
    match state.documents.get(&path) {
        Some(lines) => Json(json!({
            "lines": lines
                .iter()
                .map(|(text, confidence)| json!({"text": text, "confidence": confidence}))
                .collect::<Vec<_>>()
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, format!("no such document: {}", path)).into_response(),
    }
}
