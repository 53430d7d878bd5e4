use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use cortex_breaker::{BreakerArena, BreakerError};
use cortex_core::{HttpError, error_body};
use cortex_llm::ProviderKind;
use http::StatusCode;
use serde_json::json;

/// Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Service banner at `/`
pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": "Cortex",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

/// `GET /health/providers`
pub async fn providers_handler(State(breakers): State<Option<BreakerArena>>) -> Response {
    let Some(breakers) = breakers else {
        return breaker_error(&unavailable());
    };

    match breakers.status_all().await {
        Ok(records) => Json(json!({ "breakers": records })).into_response(),
        Err(e) => breaker_error(&e),
    }
}

/// `POST /health/reset/{provider}`
///
/// Only known provider keys are accepted so stray names never spawn a
/// breaker of their own.
pub async fn reset_handler(State(breakers): State<Option<BreakerArena>>, Path(provider): Path<String>) -> Response {
    let Some(breakers) = breakers else {
        return breaker_error(&unavailable());
    };

    if ProviderKind::from_key(&provider).is_none() {
        tracing::debug!(%provider, "reset requested for unknown provider");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": format!("Unknown provider: {provider}"), "type": "not_found_error"}})),
        )
            .into_response();
    }

    match breakers.reset(&provider).await {
        Ok(_) => {
            tracing::info!(%provider, "circuit breaker reset");
            Json(json!({ "success": true, "provider": provider })).into_response()
        }
        Err(e) => breaker_error(&e),
    }
}

fn unavailable() -> BreakerError {
    BreakerError::Unavailable("circuit breaking is disabled".to_owned())
}

fn breaker_error(error: &BreakerError) -> Response {
    tracing::warn!(error = %error, "circuit breaker request failed");
    (error.status_code(), Json(error_body(error))).into_response()
}
