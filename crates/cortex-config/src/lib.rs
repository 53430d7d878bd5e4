#![allow(clippy::must_use_candidate)]

pub mod breaker;
pub mod cors;
pub mod directory;
mod duration;
mod env;
mod loader;
pub mod providers;
pub mod rate_limit;
pub mod retry;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use breaker::*;
pub use cors::*;
pub use directory::*;
pub use providers::*;
pub use rate_limit::*;
pub use retry::*;
pub use server::*;
pub use telemetry::{LangfuseConfig, LogFormat, TelemetryConfig, default_langfuse_url};

/// Top-level Cortex configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream provider credentials and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Direct-provider credit flags consulted by the router
    #[serde(default)]
    pub credits: CreditFlags,
    /// Per-provider circuit breaker configuration
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Upstream retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Where client policies are looked up
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
