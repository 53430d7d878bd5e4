use std::time::Duration;

use serde::Deserialize;

/// Upstream retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each subsequent one
    #[serde(default = "default_base_delay", deserialize_with = "crate::duration::deserialize")]
    pub base_delay: Duration,
    /// Cap on a single backoff sleep
    #[serde(default = "default_max_delay", deserialize_with = "crate::duration::deserialize")]
    pub max_delay: Duration,
    /// Upstream statuses that are retried
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_millis(100)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![408, 429, 500, 502, 503, 504]
}
