use std::sync::Arc;
use std::time::Duration;

use cortex_auth::ClientPolicy;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{LimitKind, RateLimitError, UsageRecord, UsageStore};

/// Width of one usage bucket
const WINDOW_MS: u64 = 60_000;

/// Buckets outlive their window so a skewed clock still finds them
const BUCKET_TTL: Duration = Duration::from_secs(120);

/// Bucket key for an API key at a point in time (epoch milliseconds)
pub fn bucket_key(api_key: &str, now_ms: u64) -> String {
    format!("ratelimit:{api_key}:{}", now_ms / WINDOW_MS)
}

/// The bucket a request was admitted into
///
/// Accounting after dispatch goes to this bucket even when the minute has
/// rolled over in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    bucket: String,
    admitted_ms: u64,
}

impl Admission {
    pub fn new(api_key: &str, now_ms: u64) -> Self {
        Self {
            bucket: bucket_key(api_key, now_ms),
            admitted_ms: now_ms,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Rough token count for a set of message contents
///
/// Contents are joined with a space and each whitespace-separated word
/// counts as 1.3 tokens, rounded down.
pub fn estimate_tokens<'a>(contents: impl IntoIterator<Item = &'a str>) -> u64 {
    let words: u64 = contents
        .into_iter()
        .map(|content| content.split_whitespace().count() as u64)
        .sum();

    words * 13 / 10
}

/// Per-minute admission and accounting against a [`UsageStore`]
#[derive(Clone)]
pub struct UsageLimiter {
    store: Arc<dyn UsageStore>,
}

impl UsageLimiter {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Current usage of a bucket, zero when absent
    pub async fn usage(&self, api_key: &str, now_ms: u64) -> Result<UsageRecord, RateLimitError> {
        Ok(self.store.get(&bucket_key(api_key, now_ms)).await?.unwrap_or_default())
    }

    /// Admit or reject a request before it is dispatched
    ///
    /// Admin clients always pass. Everyone else is rejected once either
    /// counter has reached the client's ceiling for the current minute.
    pub async fn check(&self, admission: &Admission, policy: &ClientPolicy) -> Result<(), RateLimitError> {
        if policy.admin {
            return Ok(());
        }

        let usage = self.store.get(admission.bucket()).await?.unwrap_or_default();
        let limits = policy.rate_limit;

        if usage.requests >= limits.requests_per_minute {
            return Err(RateLimitError::Exceeded {
                kind: LimitKind::Requests,
                limit: limits.requests_per_minute,
            });
        }

        if usage.tokens >= limits.tokens_per_minute {
            return Err(RateLimitError::Exceeded {
                kind: LimitKind::Tokens,
                limit: limits.tokens_per_minute,
            });
        }

        Ok(())
    }

    /// Count a completed request against the bucket it was admitted into
    ///
    /// Re-reads the bucket, adds one request and `tokens`, then writes it
    /// back. Not compare-and-swap: racing writers may overwrite each other.
    pub async fn record(
        &self,
        admission: &Admission,
        policy: &ClientPolicy,
        tokens: u64,
    ) -> Result<RateLimitHeaders, RateLimitError> {
        let mut usage = self.store.get(admission.bucket()).await?.unwrap_or_default();

        usage.requests = usage.requests.saturating_add(1);
        usage.tokens = usage.tokens.saturating_add(tokens);

        self.store.put(admission.bucket(), usage, BUCKET_TTL).await?;

        Ok(RateLimitHeaders::new(
            policy.rate_limit.requests_per_minute,
            usage.requests,
            admission.admitted_ms,
        ))
    }
}

/// `RateLimit-*` response metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,
    /// Epoch milliseconds at which the current window ends
    pub reset: u64,
}

impl RateLimitHeaders {
    pub const fn new(limit: u64, used: u64, now_ms: u64) -> Self {
        Self {
            limit,
            remaining: limit.saturating_sub(used),
            used,
            reset: (now_ms / WINDOW_MS + 1) * WINDOW_MS,
        }
    }

    /// Write the headers onto a response
    pub fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("ratelimit-limit", self.limit),
            ("ratelimit-remaining", self.remaining),
            ("ratelimit-reset", self.reset),
            ("ratelimit-used", self.used),
        ];

        for (name, value) in pairs {
            headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
        }
    }
}
