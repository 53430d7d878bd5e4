use cortex_config::{FallbackStrategyConfig, RateLimitConfig, StaticClientConfig};
use serde::{Deserialize, Serialize};

/// Per-client policy resolved from an API key
///
/// Read-only to the gateway and fixed for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPolicy {
    pub app_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default = "default_allow_zai")]
    pub allow_zai: bool,
    #[serde(default)]
    pub fallback_strategy: FallbackStrategy,
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
    #[serde(default)]
    pub admin: bool,
}

/// Behaviour when no direct credits cover the requested model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    /// Route through the generic aggregator
    #[default]
    Openrouter,
    /// Refuse with payment required
    FailFast,
}

/// Per-minute ceilings for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub requests_per_minute: u64,
    pub tokens_per_minute: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            tokens_per_minute: 50_000,
        }
    }
}

impl From<FallbackStrategyConfig> for FallbackStrategy {
    fn from(value: FallbackStrategyConfig) -> Self {
        match value {
            FallbackStrategyConfig::Openrouter => Self::Openrouter,
            FallbackStrategyConfig::FailFast => Self::FailFast,
        }
    }
}

impl ClientPolicy {
    /// Build a policy from a configured client, filling limits from the gateway defaults
    pub fn from_config(config: &StaticClientConfig, limits: &RateLimitConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            name: config.name.clone(),
            default_model: config.default_model.clone(),
            allow_zai: config.allow_zai,
            fallback_strategy: config.fallback_strategy.into(),
            rate_limit: RateLimitPolicy {
                requests_per_minute: config.requests_per_minute.unwrap_or(limits.default_requests_per_minute),
                tokens_per_minute: config.tokens_per_minute.unwrap_or(limits.default_tokens_per_minute),
            },
            admin: config.admin,
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_allow_zai() -> bool {
    true
}
