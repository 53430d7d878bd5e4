//! Axum handlers for the `OpenAI`-compatible endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use bytes::Bytes;
use cortex_auth::ClientPolicy;
use cortex_core::{HttpError, error_body};
use serde::Serialize;
use serde_json::json;

use crate::error::LlmError;
use crate::state::{DEFAULT_MODEL, LlmState};
use crate::types::ChatRequest;

/// Entry in the curated model catalog
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogModel {
    pub id: &'static str,
    pub provider: &'static str,
    pub name: &'static str,
}

/// Models recommended to clients, in display order
pub const CATALOG: [CatalogModel; 5] = [
    CatalogModel {
        id: "gpt-4o",
        provider: "openai",
        name: "GPT-4o (Reasoning)",
    },
    CatalogModel {
        id: "claude-3-5-sonnet",
        provider: "anthropic",
        name: "Claude 3.5 Sonnet (Coding)",
    },
    CatalogModel {
        id: "glm-4-plus",
        provider: "z-ai",
        name: "GLM-4 (Creative)",
    },
    CatalogModel {
        id: "gpt-4o-mini",
        provider: "openai",
        name: "GPT-4o Mini (Fast)",
    },
    CatalogModel {
        id: "claude-3-haiku",
        provider: "anthropic",
        name: "Claude 3 Haiku (Economical)",
    },
];

/// Build the chat and model routes
///
/// Expects an authenticated `Arc<ClientPolicy>` extension on every request.
pub fn llm_router(state: LlmState) -> Router {
    chat_router(state).merge(models_router())
}

/// `POST /v1/chat/completions` on its own, for callers that layer it separately
pub fn chat_router(state: LlmState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .with_state(state)
}

pub fn models_router() -> Router {
    Router::new().route("/v1/models", routing::get(list_models))
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(state): State<LlmState>,
    Extension(policy): Extension<Arc<ClientPolicy>>,
    body: Bytes,
) -> Response {
    let request = match ChatRequest::from_slice(&body) {
        Ok(request) => request,
        Err(issues) => return error_response(&LlmError::InvalidRequest { issues }),
    };

    match state.dispatch(request, &policy).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

/// Handle `GET /v1/models`
async fn list_models(Extension(policy): Extension<Arc<ClientPolicy>>) -> Json<serde_json::Value> {
    Json(json!({
        "object": "list",
        "data": CATALOG,
        "defaults": {
            "system_default": DEFAULT_MODEL,
            "client_default": policy.default_model.as_deref().unwrap_or(DEFAULT_MODEL),
        }
    }))
}

fn error_response(error: &LlmError) -> Response {
    if let LlmError::Internal(message) = error {
        tracing::error!(%message, "chat completion failed");
    }

    (error.status_code(), Json(error_body(error))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use cortex_auth::{FallbackStrategy, RateLimitPolicy};
    use cortex_config::Config;
    use cortex_telemetry::NoopSink;
    use http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn policy(default_model: Option<&str>) -> Arc<ClientPolicy> {
        Arc::new(ClientPolicy {
            app_id: "kinisi".to_owned(),
            name: "Kinisi".to_owned(),
            default_model: default_model.map(str::to_owned),
            allow_zai: true,
            fallback_strategy: FallbackStrategy::Openrouter,
            rate_limit: RateLimitPolicy::default(),
            admin: false,
        })
    }

    fn app(config: &Config, policy: Arc<ClientPolicy>) -> Router {
        let state = LlmState::new(config, None, Arc::new(NoopSink)).unwrap();
        llm_router(state).layer(Extension(policy))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, http::HeaderMap, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn chat(body: &str) -> Request<Body> {
        Request::post("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn models_lists_catalog_with_client_default() {
        let app = app(&Config::default(), policy(Some("claude-3-haiku")));

        let (status, _, body) = send(app, Request::get("/v1/models").body(Body::empty()).unwrap()).await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["object"], "list");
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"][2]["id"], "glm-4-plus");
        assert_eq!(body["data"][2]["provider"], "z-ai");
        assert_eq!(body["defaults"]["system_default"], "gpt-4o");
        assert_eq!(body["defaults"]["client_default"], "claude-3-haiku");
    }

    #[tokio::test]
    async fn models_default_falls_back_to_system() {
        let app = app(&Config::default(), policy(None));

        let (_, _, body) = send(app, Request::get("/v1/models").body(Body::empty()).unwrap()).await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(body["defaults"]["client_default"], "gpt-4o");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = app(&Config::default(), policy(None));

        let (status, _, body) = send(app, chat("{not json")).await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid request");
        assert_eq!(body["error"]["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn empty_messages_is_400_with_details() {
        let app = app(&Config::default(), policy(None));

        let (status, _, body) = send(app, chat(r#"{"model":"gpt-4o","messages":[]}"#)).await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["details"][0]["message"], "At least one message is required");
    }

    #[tokio::test]
    async fn streaming_reply_is_relayed_as_sse() {
        let server = MockServer::start().await;
        let sse = "data: {\"id\":\"c1\",\"object\":\"chat.completion.chunk\",\"choices\":[]}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/openrouter"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.providers.openrouter.url = Some(format!("{}/openrouter", server.uri()).parse().unwrap());
        let app = app(&config, policy(None));

        let (status, headers, body) = send(
            app,
            chat(r#"{"model":"mistral-large","stream":true,"messages":[{"role":"user","content":"hi"}]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert!(body.ends_with("data: [DONE]\n\n"));
    }
}
