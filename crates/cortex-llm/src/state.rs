//! Dispatch orchestration for one chat completion

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cortex_auth::ClientPolicy;
use cortex_breaker::{BreakerArena, CircuitState};
use cortex_config::Config;
use cortex_core::HttpError;
use cortex_telemetry::{GatewayEvent, GatewayMetrics, LlmTrace, TelemetrySink, TokenCounts};
use jiff::Timestamp;
use serde_json::{Map, Value};

use crate::adapter::ProtocolAdapter;
use crate::error::LlmError;
use crate::relay;
use crate::retry::{self, RetryCause, RetryPolicy};
use crate::router::{ProviderRoute, ProviderRouter};
use crate::types::{ChatRequest, ChatResponse, Usage, shape_issues};

/// Model used when neither the request nor the client names one
pub const DEFAULT_MODEL: &str = "gpt-4o";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for the chat handlers
#[derive(Clone)]
pub struct LlmState {
    inner: Arc<LlmStateInner>,
}

struct LlmStateInner {
    router: ProviderRouter,
    client: reqwest::Client,
    retry: RetryPolicy,
    breakers: Option<BreakerArena>,
    sink: Arc<dyn TelemetrySink>,
    metrics: GatewayMetrics,
}

/// What the background telemetry task needs to know about a finished call
struct Completion {
    app_id: String,
    provider: &'static str,
    model: String,
    input: Value,
    output: Option<Value>,
    usage: Option<Usage>,
    started_at: Timestamp,
    started: Instant,
}

impl LlmState {
    /// Build the dispatch state from configuration
    ///
    /// `breakers` is `None` when circuit breaking is disabled, in which case
    /// every provider is treated as healthy.
    pub fn new(
        config: &Config,
        breakers: Option<BreakerArena>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Result<Self, LlmError> {
        let router = ProviderRouter::from_config(&config.providers, config.credits)?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(LlmStateInner {
                router,
                client,
                retry: RetryPolicy::from(&config.retry),
                breakers,
                sink,
                metrics: GatewayMetrics::new(),
            }),
        })
    }

    pub fn breakers(&self) -> Option<&BreakerArena> {
        self.inner.breakers.as_ref()
    }

    /// Validate, route, and forward one request, returning the client response
    pub async fn dispatch(&self, request: ChatRequest, policy: &ClientPolicy) -> Result<Response, LlmError> {
        request
            .validate()
            .map_err(|issues| LlmError::InvalidRequest { issues })?;

        let model = request
            .model
            .clone()
            .or_else(|| policy.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());

        let route = self.inner.router.route(&model, policy)?;
        let provider = route.provider.as_str();

        let probe = self.admit(provider).await?;

        let started = Instant::now();
        let result = self.forward(&request, &model, &route, policy, started).await;
        if let Some(probe) = probe {
            probe.release().await;
        }

        let status = match &result {
            Ok(response) => response.status().as_u16(),
            Err(e) => e.status_code().as_u16(),
        };
        self.inner.metrics.record_request(provider, status, started);

        result
    }

    /// Ask the provider's breaker for permission, failing open when it cannot answer
    ///
    /// A half-open admission holds a probe slot until the dispatch ends.
    async fn admit(&self, provider: &str) -> Result<Option<ProbeSlot>, LlmError> {
        let Some(breakers) = &self.inner.breakers else {
            return Ok(None);
        };

        match breakers.check(provider).await {
            Ok(verdict) if verdict.allowed => Ok((verdict.state == CircuitState::HalfOpen).then(|| ProbeSlot {
                breakers: Some(breakers.clone()),
                provider: provider.to_owned(),
            })),
            Ok(verdict) => {
                self.inner.metrics.record_breaker_rejection(provider);
                let reason = verdict.reason.unwrap_or_else(|| "Circuit breaker is open".to_owned());
                tracing::warn!(provider, %reason, "request rejected by circuit breaker");
                Err(LlmError::CircuitOpen {
                    provider: provider.to_owned(),
                    reason,
                })
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "circuit breaker unreachable, allowing request");
                Ok(None)
            }
        }
    }

    async fn forward(
        &self,
        request: &ChatRequest,
        model: &str,
        route: &ProviderRoute,
        policy: &ClientPolicy,
        started: Instant,
    ) -> Result<Response, LlmError> {
        let provider = route.provider.as_str();
        let adapter = ProtocolAdapter::for_provider(route.provider);
        let started_at = Timestamp::now();

        let payload = adapter
            .to_provider_request(request, model)
            .map_err(|e| LlmError::Internal(format!("failed to encode {provider} request: {e}")))?;
        let body = Bytes::from(
            serde_json::to_vec(&payload)
                .map_err(|e| LlmError::Internal(format!("failed to encode {provider} request: {e}")))?,
        );

        let upstream = self.send(route, body).await?;

        let status = upstream.status().as_u16();
        if !upstream.status().is_success() {
            self.record_failure(provider).await;
            let body = upstream.text().await.unwrap_or_default();
            tracing::warn!(provider, status, "upstream returned an error");
            return Err(LlmError::Provider {
                provider: provider.to_owned(),
                status,
                body,
                exhausted: self.inner.retry.is_retryable(status),
            });
        }

        let input = serde_json::to_value(&request.messages).unwrap_or_default();

        if request.stream {
            self.record_success(provider).await;
            let response = relay::relay(upstream, route.provider, model.to_owned())?;
            self.emit_telemetry(Completion {
                app_id: policy.app_id.clone(),
                provider,
                model: model.to_owned(),
                input,
                output: None,
                usage: None,
                started_at,
                started,
            });
            return Ok(response);
        }

        let completion = match read_completion(upstream, adapter, model).await {
            Ok(completion) => completion,
            Err(message) => {
                self.record_failure(provider).await;
                tracing::error!(provider, %message, "unusable upstream response");
                return Err(LlmError::MalformedResponse {
                    provider: provider.to_owned(),
                    message,
                });
            }
        };
        self.record_success(provider).await;

        self.emit_telemetry(Completion {
            app_id: policy.app_id.clone(),
            provider,
            model: model.to_owned(),
            input,
            output: serde_json::to_value(&completion.choices).ok(),
            usage: completion.usage,
            started_at,
            started,
        });

        Ok(Json(completion).into_response())
    }

    /// Send with retries; transport failures count against the breaker
    async fn send(&self, route: &ProviderRoute, body: Bytes) -> Result<reqwest::Response, LlmError> {
        let provider = route.provider.as_str();

        let sent = retry::execute(
            &self.inner.retry,
            || {
                self.inner
                    .client
                    .post(route.url.clone())
                    .headers(route.headers.clone())
                    .body(body.clone())
                    .send()
            },
            |attempt, cause| {
                match cause {
                    RetryCause::Status(status) => tracing::warn!(provider, attempt, status, "retrying upstream request"),
                    RetryCause::Transport(e) => {
                        tracing::warn!(provider, attempt, error = %e, "retrying upstream request");
                    }
                }
                self.inner.metrics.record_retry(provider);
            },
        )
        .await;

        match sent {
            Ok(upstream) => Ok(upstream),
            Err(e) => {
                self.record_failure(provider).await;
                tracing::error!(provider, error = %e, "upstream request failed");
                Err(LlmError::Transport {
                    provider: provider.to_owned(),
                    message: e.to_string(),
                })
            }
        }
    }

    async fn record_success(&self, provider: &str) {
        if let Some(breakers) = &self.inner.breakers
            && let Err(e) = breakers.record_success(provider).await
        {
            tracing::warn!(provider, error = %e, "failed to record breaker success");
        }
    }

    async fn record_failure(&self, provider: &str) {
        if let Some(breakers) = &self.inner.breakers
            && let Err(e) = breakers.record_failure(provider).await
        {
            tracing::warn!(provider, error = %e, "failed to record breaker failure");
        }
    }

    /// Send the trace and event on a detached task
    fn emit_telemetry(&self, completion: Completion) {
        let sink = Arc::clone(&self.inner.sink);
        let metrics = self.inner.metrics.clone();

        tokio::spawn(async move {
            let Completion {
                app_id,
                provider,
                model,
                input,
                output,
                usage,
                started_at,
                started,
            } = completion;

            let tokens = usage.map(|u| TokenCounts {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
            let cost = tokens.map_or(0.0, |t| {
                sink.estimate_cost(provider, &model, t.prompt_tokens, t.completion_tokens)
            });
            if let Some(t) = tokens {
                metrics.record_tokens(provider, t.prompt_tokens, t.completion_tokens);
            }

            let trace = LlmTrace {
                name: "llm-completion".to_owned(),
                app_id: app_id.clone(),
                provider: provider.to_owned(),
                model: model.clone(),
                input,
                output,
                usage: tokens,
                start_time: started_at,
                end_time: Timestamp::now(),
            };
            if let Err(e) = sink.create_trace(trace).await {
                tracing::warn!(provider, error = %e, "failed to deliver completion trace");
            }

            let mut metadata = Map::new();
            metadata.insert(
                "duration".to_owned(),
                Value::from(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)),
            );
            metadata.insert("status".to_owned(), Value::from(200));
            metadata.insert("cost".to_owned(), Value::from(cost));

            sink.log_event(&GatewayEvent {
                event: "llm_request".to_owned(),
                app_id,
                provider: Some(provider.to_owned()),
                model: Some(model),
                metadata,
            });
        });
    }
}

/// Half-open probe slot held for the length of one dispatch
///
/// Handed back when the dispatch ends, and from `Drop` when the dispatch
/// future is abandoned by a timeout or a disconnected client. Releasing
/// after the outcome was recorded is a no-op.
struct ProbeSlot {
    breakers: Option<BreakerArena>,
    provider: String,
}

impl ProbeSlot {
    async fn release(mut self) {
        if let Some(breakers) = self.breakers.take() {
            release_probe(&breakers, &self.provider).await;
        }
    }
}

impl Drop for ProbeSlot {
    fn drop(&mut self) {
        let Some(breakers) = self.breakers.take() else {
            return;
        };
        let provider = std::mem::take(&mut self.provider);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { release_probe(&breakers, &provider).await });
        }
    }
}

async fn release_probe(breakers: &BreakerArena, provider: &str) {
    if let Err(e) = breakers.release_probe(provider).await {
        tracing::warn!(provider, error = %e, "failed to release half-open probe slot");
    }
}

/// Read, parse and translate a non-streaming upstream body
async fn read_completion(
    upstream: reqwest::Response,
    adapter: ProtocolAdapter,
    model: &str,
) -> Result<ChatResponse, String> {
    let bytes = upstream.bytes().await.map_err(|e| e.to_string())?;
    let body: Value = serde_json::from_slice(&bytes).map_err(|e| format!("response is not JSON: {e}"))?;

    let issues = shape_issues(&body);
    if !issues.is_empty() {
        tracing::warn!(?issues, "upstream response does not match the chat completion shape");
    }

    adapter
        .to_canonical_response(body, model)
        .map_err(|e| format!("unexpected response shape: {e}"))
}
