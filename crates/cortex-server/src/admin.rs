use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use cortex_auth::{ClientDirectory, ClientPolicy};
use cortex_core::{HttpError, error_body};
use cortex_ratelimit::{RateLimitError, UsageLimiter, UsageRecord};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::now_ms;

const MINUTE_MS: u64 = 60_000;

#[derive(Clone)]
pub struct AdminState {
    pub directory: Arc<dyn ClientDirectory>,
    pub limiter: UsageLimiter,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientUsage {
    api_key: String,
    client: Option<ClientPolicy>,
    usage: UsageRecord,
}

/// Routes under `/admin`; callers add authentication
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/usage", routing::get(usage_handler))
        .route("/admin/clients", routing::get(clients_handler))
        .with_state(state)
}

/// `GET /admin/usage[?key=]`
///
/// Without a key, reports every client the directory can enumerate.
async fn usage_handler(State(state): State<AdminState>, Query(query): Query<UsageQuery>) -> Response {
    let now = now_ms();
    let current_minute = minute_start(now);

    if let Some(api_key) = query.key {
        return match client_usage(&state, api_key, now).await {
            Ok(entry) => Json(json!({
                "apiKey": entry.api_key,
                "client": entry.client,
                "currentMinute": current_minute,
                "usage": entry.usage,
            }))
            .into_response(),
            Err(e) => store_error(&e),
        };
    }

    let mut clients = Vec::new();
    for api_key in state.directory.known_keys() {
        match client_usage(&state, api_key, now).await {
            Ok(entry) => clients.push(entry),
            Err(e) => return store_error(&e),
        }
    }

    Json(json!({
        "currentMinute": current_minute,
        "clients": clients,
    }))
    .into_response()
}

/// `GET /admin/clients`
async fn clients_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Client listing requires a separate index or database",
        "note": "Use ?key=<apiKey> query parameter to check specific client usage",
    }))
}

async fn client_usage(state: &AdminState, api_key: String, now: u64) -> Result<ClientUsage, RateLimitError> {
    let usage = state.limiter.usage(&api_key, now).await?;

    let client = match state.directory.get(&api_key).await {
        Ok(client) => client.map(|policy| ClientPolicy::clone(&policy)),
        Err(e) => {
            tracing::warn!(error = %e, "client lookup failed while reporting usage");
            None
        }
    };

    Ok(ClientUsage { api_key, client, usage })
}

/// ISO-8601 start of the minute containing `now_ms`
fn minute_start(now_ms: u64) -> String {
    let start = now_ms / MINUTE_MS * MINUTE_MS;
    i64::try_from(start)
        .ok()
        .and_then(|ms| Timestamp::from_millisecond(ms).ok())
        .unwrap_or(Timestamp::UNIX_EPOCH)
        .to_string()
}

fn store_error(error: &RateLimitError) -> Response {
    tracing::error!(error = %error, "usage store unavailable");
    (error.status_code(), Json(error_body(error))).into_response()
}
