//! Analytics endpoints
//!
//! Cost and usage analytics live in the Langfuse project that receives
//! traces; these routes point callers at it and echo their filters.

use axum::extract::{Query, State};
use axum::{Json, Router, routing};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

const AVAILABLE_METRICS: [&str; 6] = [
    "total_requests",
    "total_tokens",
    "total_cost",
    "avg_latency",
    "error_rate",
    "provider_distribution",
];

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(alias = "app", skip_serializing_if = "Option::is_none")]
    app_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    app: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    format: String,
    #[serde(alias = "app", skip_serializing_if = "Option::is_none")]
    app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
}

fn default_format() -> String {
    "json".to_owned()
}

/// Routes under `/analytics`, pointing at the given Langfuse base URL
pub fn analytics_router(langfuse_url: Url) -> Router {
    Router::new()
        .route("/analytics/costs", routing::get(costs_handler))
        .route("/analytics/metrics", routing::get(metrics_handler))
        .route("/analytics/export", routing::get(export_handler))
        .with_state(langfuse_url)
}

async fn costs_handler(State(langfuse): State<Url>, Query(params): Query<CostQuery>) -> Json<Value> {
    Json(json!({
        "message": "Cost data is available in LangFuse dashboard",
        "langfuseUrl": langfuse.as_str(),
        "params": params,
        "note": "Use LangFuse dashboard for detailed cost analysis per app and provider",
    }))
}

async fn metrics_handler(State(langfuse): State<Url>, Query(params): Query<MetricsQuery>) -> Json<Value> {
    let mut filters = serde_json::Map::new();
    if let Some(app) = params.app {
        filters.insert("appId".to_owned(), Value::String(app));
    }

    Json(json!({
        "message": "Metrics are available in LangFuse dashboard",
        "langfuseUrl": langfuse.as_str(),
        "filters": filters,
        "availableMetrics": AVAILABLE_METRICS,
    }))
}

async fn export_handler(State(langfuse): State<Url>, Query(params): Query<ExportQuery>) -> Json<Value> {
    Json(json!({
        "exportUrl": langfuse.as_str(),
        "instructions": "Use LangFuse dashboard to export data in CSV or JSON format",
        "params": params,
    }))
}
