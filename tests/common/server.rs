//! In-process fake of the external HTTP APIs
//!
//! One axum server answers the OpenAI-compatible `/chat/completions` and
//! `/embeddings` endpoints and the YouTube `/search` endpoint. Replies are
//! scripted per test and every request is recorded.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
struct FakeState {
    chat_replies: Arc<Mutex<VecDeque<(u16, String)>>>,
    embedding: Arc<Mutex<Vec<f32>>>,
    search: Arc<Mutex<Option<(u16, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeState {
    fn record(
        &self,
        path: &str,
        headers: &HeaderMap,
        query: HashMap<String, String>,
        body: Option<Value>,
    ) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            query,
            authorization,
            body,
        });
    }
}

/// Fake API server instance
///
/// When dropped, the server shuts down.
pub struct FakeApiServer {
    /// Base URL for the clients (e.g., "http://127.0.0.1:12345")
    pub base_url: String,
    state: FakeState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeApiServer {
    pub async fn spawn() -> Self {
        let state = FakeState::default();
        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .route("/embeddings", post(embeddings))
            .route("/search", get(search))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Queue the content of the next chat completion.
    pub fn push_chat_reply(&self, content: &str) {
        self.state
            .chat_replies
            .lock()
            .unwrap()
            .push_back((200, content.to_string()));
    }

    /// Queue an error status for the next chat completion.
    pub fn push_chat_error(&self, status: u16) {
        self.state
            .chat_replies
            .lock()
            .unwrap()
            .push_back((status, String::new()));
    }

    pub fn set_embedding(&self, vector: Vec<f32>) {
        *self.state.embedding.lock().unwrap() = vector;
    }

    pub fn set_search_response(&self, status: u16, body: Value) {
        *self.state.search.lock().unwrap() = Some((status, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn chat_completions(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/chat/completions", &headers, HashMap::new(), Some(body));
    let reply = state.chat_replies.lock().unwrap().pop_front();
    match reply {
        Some((200, content)) => Json(json!({
            "id": "chatcmpl-test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }))
        .into_response(),
        Some((code, _)) => (status(code), "scripted failure").into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no reply scripted").into_response(),
    }
}

async fn embeddings(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/embeddings", &headers, HashMap::new(), Some(body));
    let vector = state.embedding.lock().unwrap().clone();
    Json(json!({
        "object": "list",
        "data": [{"object": "embedding", "index": 0, "embedding": vector}],
        "model": "test-embedding"
    }))
    .into_response()
}

async fn search(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.record("/search", &headers, query, None);
    let scripted = state.search.lock().unwrap().clone();
    match scripted {
        Some((200, body)) => Json(body).into_response(),
        Some((code, body)) => (status(code), Json(body)).into_response(),
        None => Json(json!({"items": []})).into_response(),
    }
}
