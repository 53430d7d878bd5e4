//! Mock upstream for every provider the gateway routes to
//!
//! `/{provider}/chat/completions` speaks the `OpenAI` format for Z.ai,
//! `OpenAI` and `OpenRouter`; `/anthropic/messages` speaks the Messages API.
//! Each path counts its calls, remembers the last body and headers, and can
//! be scripted to fail a number of times before answering.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const ANTHROPIC: &str = "anthropic";
pub const OPENAI: &str = "openai";
pub const OPENROUTER: &str = "openrouter";
pub const ZAI: &str = "zai";

/// Mock provider backend with per-provider bookkeeping
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    calls: Mutex<HashMap<String, u32>>,
    last_body: Mutex<HashMap<String, Value>>,
    last_headers: Mutex<HashMap<String, HeaderMap>>,
    /// Remaining scripted failures per provider: (status, count)
    failures: Mutex<HashMap<String, (u16, u32)>>,
}

impl MockState {
    /// Record a call and return the scripted failure status, if any is left
    fn observe(&self, provider: &str, headers: HeaderMap, body: Value) -> Option<u16> {
        *self.calls.lock().unwrap().entry(provider.to_owned()).or_default() += 1;
        self.last_body.lock().unwrap().insert(provider.to_owned(), body);
        self.last_headers.lock().unwrap().insert(provider.to_owned(), headers);

        let mut failures = self.failures.lock().unwrap();
        let (status, remaining) = failures.get_mut(provider)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(*status)
    }
}

impl MockProvider {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/anthropic/messages", routing::post(handle_messages))
            .route("/{provider}/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Absolute URL of a path on the mock
    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{path}", self.addr)).unwrap()
    }

    /// Fail the next `times` calls to `provider` with `status`
    pub fn fail_next(&self, provider: &str, status: u16, times: u32) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(provider.to_owned(), (status, times));
    }

    pub fn calls(&self, provider: &str) -> u32 {
        self.state.calls.lock().unwrap().get(provider).copied().unwrap_or_default()
    }

    pub fn last_body(&self, provider: &str) -> Value {
        self.state.last_body.lock().unwrap().get(provider).cloned().unwrap_or_default()
    }

    pub fn last_header(&self, provider: &str, name: &str) -> Option<String> {
        let headers = self.state.last_headers.lock().unwrap();
        headers
            .get(provider)?
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let model = body["model"].as_str().unwrap_or_default().to_owned();
    let stream = body["stream"].as_bool().unwrap_or_default();

    if let Some(status) = state.observe(&provider, headers, body) {
        return failure(status);
    }

    if stream {
        let frames = ["Hel", "lo"]
            .iter()
            .map(|text| {
                let chunk = json!({
                    "id": "chatcmpl-mock",
                    "object": "chat.completion.chunk",
                    "created": 1_700_000_000,
                    "model": model,
                    "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}],
                });
                format!("data: {chunk}\n\n")
            })
            .chain(std::iter::once("data: [DONE]\n\n".to_owned()))
            .collect::<String>();
        return sse(frames);
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": format!("Hello from {provider}")},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12},
    }))
    .into_response()
}

async fn handle_messages(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let model = body["model"].as_str().unwrap_or_default().to_owned();
    let stream = body["stream"].as_bool().unwrap_or_default();

    if let Some(status) = state.observe(ANTHROPIC, headers, body) {
        return failure(status);
    }

    if stream {
        let events = [
            ("message_start", json!({"type": "message_start", "message": {"id": "msg_mock", "model": model}})),
            ("content_block_delta", json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hel"}})),
            ("content_block_delta", json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "lo"}})),
            ("message_stop", json!({"type": "message_stop"})),
        ];
        let frames = events
            .iter()
            .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
            .collect::<String>();
        return sse(frames);
    }

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{"type": "text", "text": "Hello from anthropic"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 5, "output_tokens": 7},
    }))
    .into_response()
}

fn failure(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    (status, Json(json!({"error": {"message": "scripted failure"}}))).into_response()
}

fn sse(frames: String) -> Response {
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from(frames))
        .unwrap()
}
