//! Gateway metric names and instruments

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const REQUEST_COUNT: &str = "cortex.request.count";
pub const REQUEST_DURATION: &str = "cortex.request.duration";
pub const UPSTREAM_RETRY_COUNT: &str = "cortex.upstream.retry.count";
pub const BREAKER_REJECTIONS: &str = "cortex.breaker.rejections";
pub const TOKEN_USAGE: &str = "cortex.token.usage";

/// Instruments recorded by the dispatch path
///
/// Built from the global meter, so construct it after [`crate::init`].
#[derive(Clone)]
pub struct GatewayMetrics {
    request_count: Counter<u64>,
    request_duration: Histogram<f64>,
    retry_count: Counter<u64>,
    breaker_rejections: Counter<u64>,
    token_usage: Counter<u64>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let meter = global::meter("cortex");

        Self {
            request_count: meter
                .u64_counter(REQUEST_COUNT)
                .with_description("Completed chat requests by provider and status")
                .build(),
            request_duration: meter
                .f64_histogram(REQUEST_DURATION)
                .with_unit("s")
                .with_description("Upstream dispatch latency")
                .build(),
            retry_count: meter
                .u64_counter(UPSTREAM_RETRY_COUNT)
                .with_description("Upstream attempts beyond the first")
                .build(),
            breaker_rejections: meter
                .u64_counter(BREAKER_REJECTIONS)
                .with_description("Requests refused by an open circuit")
                .build(),
            token_usage: meter
                .u64_counter(TOKEN_USAGE)
                .with_description("Tokens reported by upstream providers")
                .build(),
        }
    }

    /// Count one finished dispatch and its latency
    pub fn record_request(&self, provider: &str, status: u16, start: Instant) {
        let attrs = [
            KeyValue::new("provider", provider.to_owned()),
            KeyValue::new("status", i64::from(status)),
        ];

        self.request_count.add(1, &attrs);
        self.request_duration.record(start.elapsed().as_secs_f64(), &attrs);
    }

    pub fn record_retry(&self, provider: &str) {
        self.retry_count.add(1, &[KeyValue::new("provider", provider.to_owned())]);
    }

    pub fn record_breaker_rejection(&self, provider: &str) {
        self.breaker_rejections
            .add(1, &[KeyValue::new("provider", provider.to_owned())]);
    }

    /// Add prompt and completion tokens under separate `kind` attributes
    pub fn record_tokens(&self, provider: &str, prompt: u64, completion: u64) {
        for (kind, count) in [("prompt", prompt), ("completion", completion)] {
            self.token_usage.add(
                count,
                &[
                    KeyValue::new("provider", provider.to_owned()),
                    KeyValue::new("kind", kind),
                ],
            );
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
