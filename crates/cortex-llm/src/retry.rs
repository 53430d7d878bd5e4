//! Exponential backoff around upstream sends

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use cortex_config::RetryConfig;
use rand::Rng;

/// Upper bound of the random jitter added to every delay
const JITTER_MS: u64 = 100;

/// Error messages that mark a transport failure as worth retrying
const TRANSIENT_MARKERS: [&str; 7] = [
    "econnreset",
    "econnrefused",
    "etimedout",
    "enotfound",
    "eai_again",
    "network",
    "timeout",
];

/// How often and how patiently to retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    ///
    /// `base * 2^attempt` plus up to 100ms of jitter, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(2_u32.saturating_pow(attempt));
        let jitter = Duration::from_millis(rand::rng().random_range(0..JITTER_MS));
        exponential.saturating_add(jitter).min(self.max_delay)
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Anything carrying an HTTP status
pub trait HasStatus {
    fn status_code(&self) -> u16;
}

impl HasStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Transport errors that may succeed on a second try
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for reqwest::Error {
    fn is_transient(&self) -> bool {
        if self.is_connect() || self.is_timeout() {
            return true;
        }

        let mut source: Option<&dyn StdError> = Some(self);
        while let Some(err) = source {
            if is_transient_message(&err.to_string()) {
                return true;
            }
            source = err.source();
        }
        false
    }
}

/// Case-insensitive match against the known network failure vocabulary
pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Why a retry is about to happen
#[derive(Debug)]
pub enum RetryCause<'a, E> {
    Status(u16),
    Transport(&'a E),
}

/// Run `send` until it succeeds, fails permanently, or the budget is spent
///
/// A response whose status is in the retryable set is retried; once the
/// budget is spent the last response is returned as is. Transport errors
/// are retried only while transient, and the last one is returned once the
/// budget is spent. `on_retry` sees the 1-based number of the retry about
/// to run.
pub async fn execute<R, E, F, Fut, C>(policy: &RetryPolicy, mut send: F, mut on_retry: C) -> Result<R, E>
where
    R: HasStatus,
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    C: FnMut(u32, RetryCause<'_, E>),
{
    let mut attempt = 0;

    loop {
        let has_budget = attempt < policy.max_retries;

        match send().await {
            Ok(response) => {
                let status = response.status_code();
                if !has_budget || !policy.is_retryable(status) {
                    return Ok(response);
                }
                on_retry(attempt + 1, RetryCause::Status(status));
            }
            Err(err) => {
                if !has_budget || !err.is_transient() {
                    return Err(err);
                }
                on_retry(attempt + 1, RetryCause::Transport(&err));
            }
        }

        tokio::time::sleep(policy.backoff(attempt)).await;
        attempt += 1;
    }
}
