use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use cortex_auth::ClientPolicy;
use cortex_core::{HttpError, error_body};
use cortex_ratelimit::{Admission, UsageLimiter, estimate_tokens};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::auth::ApiKey;
use crate::now_ms;

/// Largest chat body buffered for token estimation
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Just enough of a chat request to estimate its size
#[derive(Deserialize)]
struct TokenSource {
    #[serde(default)]
    messages: Vec<MessageText>,
}

#[derive(Deserialize)]
struct MessageText {
    #[serde(default)]
    content: String,
}

/// Per-minute admission before dispatch and accounting after it
///
/// Usage is only recorded for responses below 400, always in the bucket
/// the request was admitted into, and those responses carry the
/// `RateLimit-*` headers. Store failures are logged and let the
/// request through.
pub async fn enforce(
    State(limiter): State<UsageLimiter>,
    Extension(api_key): Extension<ApiKey>,
    Extension(policy): Extension<Arc<ClientPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if policy.admin {
        return next.run(request).await;
    }

    let admission = Admission::new(&api_key.0, now_ms());

    match limiter.check(&admission, &policy).await {
        Ok(()) => {}
        Err(e @ cortex_ratelimit::RateLimitError::Exceeded { .. }) => {
            tracing::info!(app_id = %policy.app_id, error = %e, "rate limit exceeded");
            return (e.status_code(), Json(error_body(&e))).into_response();
        }
        Err(e) => tracing::warn!(error = %e, "usage store unavailable, admitting request"),
    }

    let (parts, body) = request.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_BODY_BYTES).await else {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({"error": {"message": "Request body too large", "type": "invalid_request_error"}})),
        )
            .into_response();
    };

    let tokens = serde_json::from_slice::<TokenSource>(&bytes)
        .map(|source| estimate_tokens(source.messages.iter().map(|m| m.content.as_str())))
        .unwrap_or(0);

    let mut response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    if response.status().as_u16() < 400 {
        match limiter.record(&admission, &policy, tokens).await {
            Ok(headers) => headers.apply(response.headers_mut()),
            Err(e) => tracing::warn!(error = %e, "failed to record usage"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Router, middleware};
    use cortex_auth::{FallbackStrategy, RateLimitPolicy};
    use cortex_ratelimit::storage::memory::MemoryUsageStore;
    use tower::ServiceExt;

    use super::*;

    fn policy(requests_per_minute: u64, admin: bool) -> Arc<ClientPolicy> {
        Arc::new(ClientPolicy {
            app_id: "kinisi".to_owned(),
            name: "Kinisi".to_owned(),
            default_model: None,
            allow_zai: true,
            fallback_strategy: FallbackStrategy::Openrouter,
            rate_limit: RateLimitPolicy {
                requests_per_minute,
                tokens_per_minute: 50_000,
            },
            admin,
        })
    }

    fn app(limiter: UsageLimiter, policy: Arc<ClientPolicy>, status: StatusCode) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(move || async move { status }))
            .layer(middleware::from_fn_with_state(limiter, enforce))
            .layer(Extension(ApiKey("sk-client".to_owned())))
            .layer(Extension(policy))
    }

    async fn chat(app: Router) -> Response {
        let request = http::Request::post("/v1/chat/completions")
            .body(Body::from(r#"{"messages":[{"role":"user","content":"one two three four five six seven eight nine ten"}]}"#))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    fn limiter() -> UsageLimiter {
        UsageLimiter::new(Arc::new(MemoryUsageStore::new()))
    }

    #[tokio::test]
    async fn success_is_counted_and_annotated() {
        let limiter = limiter();
        let response = chat(app(limiter.clone(), policy(5, false), StatusCode::OK)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "5");
        assert_eq!(response.headers()["ratelimit-used"], "1");
        assert_eq!(response.headers()["ratelimit-remaining"], "4");

        let usage = limiter.usage("sk-client", now_ms()).await.unwrap();
        assert_eq!(usage.requests, 1);
        assert_eq!(usage.tokens, 13);
    }

    #[tokio::test]
    async fn error_responses_are_not_counted() {
        let limiter = limiter();
        let response = chat(app(limiter.clone(), policy(5, false), StatusCode::BAD_GATEWAY)).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get("ratelimit-limit").is_none());
        assert_eq!(limiter.usage("sk-client", now_ms()).await.unwrap().requests, 0);
    }

    #[tokio::test]
    async fn ceiling_rejects_with_kind() {
        let limiter = limiter();
        let app = app(limiter, policy(1, false), StatusCode::OK);

        assert_eq!(chat(app.clone()).await.status(), StatusCode::OK);

        let response = chat(app).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["message"], "Rate limit exceeded");
        assert_eq!(body["error"]["type"], "requests");
        assert_eq!(body["error"]["limit"], 1);
    }

    #[tokio::test]
    async fn admin_is_neither_limited_nor_counted() {
        let limiter = limiter();
        let app = app(limiter.clone(), policy(1, true), StatusCode::OK);

        for _ in 0..3 {
            let response = chat(app.clone()).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get("ratelimit-limit").is_none());
        }
        assert_eq!(limiter.usage("sk-client", now_ms()).await.unwrap().requests, 0);
    }
}
