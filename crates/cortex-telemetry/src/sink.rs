//! Destinations for per-completion traces and structured gateway events

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cortex_config::{LangfuseConfig, TelemetryConfig};
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value, json};
use url::Url;
use uuid::Uuid;

use crate::TelemetryError;

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// One completed LLM call
#[derive(Debug, Clone)]
pub struct LlmTrace {
    pub name: String,
    pub app_id: String,
    pub provider: String,
    pub model: String,
    pub input: Value,
    pub output: Option<Value>,
    pub usage: Option<TokenCounts>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// A structured gateway event
#[derive(Debug, Clone, Serialize)]
pub struct GatewayEvent {
    pub event: String,
    pub app_id: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Receiver of traces and events for completed requests
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record a trace with one generation
    async fn create_trace(&self, trace: LlmTrace) -> Result<(), TelemetryError>;

    /// Emit a structured event at target `cortex::events`
    fn log_event(&self, event: &GatewayEvent) {
        let metadata = Value::Object(event.metadata.clone());

        tracing::info!(
            target: "cortex::events",
            event = %event.event,
            app_id = %event.app_id,
            provider = event.provider.as_deref(),
            model = event.model.as_deref(),
            timestamp = %Timestamp::now(),
            metadata = %metadata,
            "gateway event"
        );
    }

    /// Estimated USD cost of a completion
    fn estimate_cost(&self, provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        crate::cost::estimate_cost(provider, model, prompt_tokens, completion_tokens)
    }
}

/// Sink used when no trace backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    async fn create_trace(&self, _trace: LlmTrace) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Ingestion API under `base`, keeping any path prefix it carries
fn ingestion_endpoint(base: &Url) -> Result<Url, TelemetryError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let prefix = format!("{}/", base.path());
        base.set_path(&prefix);
    }

    Ok(base.join("api/public/ingestion")?)
}

/// Sink that posts to the Langfuse ingestion API
pub struct LangfuseSink {
    client: reqwest::Client,
    endpoint: Url,
    public_key: SecretString,
    secret_key: SecretString,
}

impl LangfuseSink {
    pub fn new(config: &LangfuseConfig) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            endpoint: ingestion_endpoint(&config.base_url)?,
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn batch(trace: &LlmTrace) -> Value {
        let trace_id = Uuid::new_v4().to_string();
        let now = Timestamp::now().to_string();

        let usage = trace.usage.map(|u| {
            json!({
                "input": u.prompt_tokens,
                "output": u.completion_tokens,
                "total": u.total_tokens,
            })
        });

        json!({
            "batch": [
                {
                    "id": Uuid::new_v4().to_string(),
                    "timestamp": now,
                    "type": "trace-create",
                    "body": {
                        "id": trace_id,
                        "name": trace.name,
                        "timestamp": trace.start_time.to_string(),
                        "metadata": {
                            "appId": trace.app_id,
                            "provider": trace.provider,
                            "model": trace.model,
                        },
                    },
                },
                {
                    "id": Uuid::new_v4().to_string(),
                    "timestamp": now,
                    "type": "generation-create",
                    "body": {
                        "id": Uuid::new_v4().to_string(),
                        "traceId": trace_id,
                        "name": trace.name,
                        "model": trace.model,
                        "input": trace.input,
                        "output": trace.output,
                        "usage": usage,
                        "startTime": trace.start_time.to_string(),
                        "endTime": trace.end_time.to_string(),
                    },
                },
            ]
        })
    }
}

#[async_trait]
impl TelemetrySink for LangfuseSink {
    async fn create_trace(&self, trace: LlmTrace) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(self.public_key.expose_secret(), Some(self.secret_key.expose_secret()))
            .json(&Self::batch(&trace))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(provider = %trace.provider, model = %trace.model, "trace delivered");
        Ok(())
    }
}

/// Pick the sink described by configuration
pub fn build_sink(config: Option<&TelemetryConfig>) -> anyhow::Result<Arc<dyn TelemetrySink>> {
    match config.and_then(|c| c.langfuse.as_ref()) {
        Some(langfuse) => {
            let sink = LangfuseSink::new(langfuse).map_err(|e| anyhow::anyhow!("failed to build trace sink: {e}"))?;
            tracing::info!(base_url = %langfuse.base_url, "langfuse tracing enabled");
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(NoopSink)),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn trace() -> LlmTrace {
        LlmTrace {
            name: "llm-completion".to_owned(),
            app_id: "kinisi".to_owned(),
            provider: "anthropic-direct".to_owned(),
            model: "claude-3-5-sonnet".to_owned(),
            input: json!([{"role": "user", "content": "hi"}]),
            output: Some(json!({"id": "chatcmpl-1"})),
            usage: Some(TokenCounts {
                prompt_tokens: 3,
                completion_tokens: 5,
                total_tokens: 8,
            }),
            start_time: Timestamp::from_second(1_700_000_000).unwrap(),
            end_time: Timestamp::from_second(1_700_000_002).unwrap(),
        }
    }

    fn config(server: &MockServer) -> LangfuseConfig {
        LangfuseConfig {
            public_key: SecretString::from("pk-lf"),
            secret_key: SecretString::from("sk-lf"),
            base_url: Url::parse(&server.uri()).unwrap(),
        }
    }

    #[tokio::test]
    async fn posts_trace_and_generation_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/ingestion"))
            .and(basic_auth("pk-lf", "sk-lf"))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({"successes": [], "errors": []})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = LangfuseSink::new(&config(&server)).unwrap();
        sink.create_trace(trace()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let batch = body["batch"].as_array().unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["type"], "trace-create");
        assert_eq!(batch[0]["body"]["metadata"]["appId"], "kinisi");
        assert_eq!(batch[1]["type"], "generation-create");
        assert_eq!(batch[1]["body"]["traceId"], batch[0]["body"]["id"]);
        assert_eq!(batch[1]["body"]["usage"]["total"], 8);
        assert_eq!(batch[1]["body"]["model"], "claude-3-5-sonnet");
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/langfuse/api/public/ingestion"))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({"successes": [], "errors": []})))
            .expect(1)
            .mount(&server)
            .await;

        let config = LangfuseConfig {
            base_url: Url::parse(&format!("{}/langfuse", server.uri())).unwrap(),
            ..config(&server)
        };
        LangfuseSink::new(&config).unwrap().create_trace(trace()).await.unwrap();
    }

    #[test]
    fn ingestion_endpoint_joins_under_prefix() {
        let bare = Url::parse("https://cloud.langfuse.com").unwrap();
        let prefixed = Url::parse("https://corvo.dev/observability").unwrap();
        let slashed = Url::parse("https://corvo.dev/observability/").unwrap();

        assert_eq!(
            ingestion_endpoint(&bare).unwrap().as_str(),
            "https://cloud.langfuse.com/api/public/ingestion"
        );
        assert_eq!(
            ingestion_endpoint(&prefixed).unwrap().as_str(),
            "https://corvo.dev/observability/api/public/ingestion"
        );
        assert_eq!(ingestion_endpoint(&slashed).unwrap(), ingestion_endpoint(&prefixed).unwrap());
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad keys"))
            .mount(&server)
            .await;

        let sink = LangfuseSink::new(&config(&server)).unwrap();
        let err = sink.create_trace(trace()).await.unwrap_err();

        assert!(matches!(err, TelemetryError::Rejected { status: 401, ref body } if body == "bad keys"));
    }

    #[tokio::test]
    async fn noop_sink_accepts_everything() {
        NoopSink.create_trace(trace()).await.unwrap();
        assert!(NoopSink.estimate_cost("openrouter", "x", 1_000_000, 0) > 0.0);
    }

    #[test]
    fn unconfigured_telemetry_builds_noop() {
        let sink = build_sink(None).unwrap();
        assert!((sink.estimate_cost("openai-direct", "gpt-4o", 1_000_000, 0) - 2.5).abs() < 1e-9);
    }
}
