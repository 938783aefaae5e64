//! Test utilities for tally-core
//!
//! This module provides a mock Gemini server speaking the generateContent REST
//! API, for integration tests and offline development.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// What the mock server answers to generateContent
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A single candidate with this text
    Text(String),
    /// A reply with no candidates (empty model output)
    Empty,
    /// An HTTP error status with a body
    Status(u16, String),
}

/// A generateContent request as received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path segment after `/models/` (e.g. `gemini-2.5-flash:generateContent`)
    pub model_action: String,
    /// Value of the `x-goog-api-key` header
    pub api_key: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl RecordedRequest {
    /// The request's content parts
    pub fn parts(&self) -> Vec<Value> {
        self.body["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }
}

struct ServerState {
    reply: MockReply,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock Gemini server for testing and development
pub struct MockGeminiServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start a server replying with `text` on an available port
    pub async fn start(text: impl Into<String>) -> Self {
        Self::start_with(MockReply::Text(text.into())).await
    }

    /// Start a server with a specific reply
    pub async fn start_with(reply: MockReply) -> Self {
        let state = Arc::new(ServerState {
            reply,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(
                "/v1beta/models/:model_action",
                post(handle_generate).get(handle_model_info),
            )
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

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// generateContent endpoint
async fn handle_generate(
    State(state): State<Arc<ServerState>>,
    Path(model_action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        model_action,
        api_key,
        query,
        body,
    });

    match &state.reply {
        MockReply::Text(text) => Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        MockReply::Empty => Json(json!({ "candidates": [] })).into_response(),
        MockReply::Status(code, body) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        )
            .into_response(),
    }
}

/// Model metadata endpoint (health check)
async fn handle_model_info(Path(model_action): Path<String>) -> Json<Value> {
    Json(json!({
        "name": format!("models/{}", model_action),
        "supportedGenerationMethods": ["generateContent"]
    }))
}
