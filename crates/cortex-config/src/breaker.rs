use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::rate_limit::RedisConfig;

/// Circuit breaker configuration shared by every provider
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// When false the breaker arena is not started and dispatch is never gated
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before probing
    #[serde(default = "default_open_timeout", deserialize_with = "crate::duration::deserialize")]
    pub open_timeout: Duration,
    /// Probe calls tracked while half-open
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
    /// Reject calls beyond `half_open_max_calls` instead of only counting them
    #[serde(default)]
    pub enforce_half_open_limit: bool,
    /// Where circuit records are persisted
    #[serde(default)]
    pub storage: BreakerStorage,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            failure_threshold: default_failure_threshold(),
            open_timeout: default_open_timeout(),
            half_open_max_calls: default_half_open_max_calls(),
            enforce_half_open_limit: false,
            storage: BreakerStorage::default(),
        }
    }
}

/// Circuit record persistence backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakerStorage {
    /// Process memory only; records do not survive a restart
    #[default]
    Memory,
    /// One JSON document per provider in a directory
    File { path: PathBuf },
    /// Redis keys shared between gateway instances
    Redis(RedisConfig),
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_open_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_half_open_max_calls() -> u32 {
    1
}
