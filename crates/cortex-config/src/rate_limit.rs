use serde::Deserialize;
use url::Url;

/// Per-client, per-minute rate limiting
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Usage counter storage backend
    #[serde(default)]
    pub storage: UsageStorage,
    /// Applied to clients whose policy omits `requests_per_minute`
    #[serde(default = "default_requests_per_minute")]
    pub default_requests_per_minute: u64,
    /// Applied to clients whose policy omits `tokens_per_minute`
    #[serde(default = "default_tokens_per_minute")]
    pub default_tokens_per_minute: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            storage: UsageStorage::default(),
            default_requests_per_minute: default_requests_per_minute(),
            default_tokens_per_minute: default_tokens_per_minute(),
        }
    }
}

/// Usage counter storage backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageStorage {
    /// In-memory storage (single instance only)
    #[default]
    Memory,
    /// Redis-backed storage (shared between instances)
    Redis(RedisConfig),
}

/// Redis connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: Url,
    /// Prefix prepended to every key written by the gateway
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

const fn default_requests_per_minute() -> u64 {
    100
}

const fn default_tokens_per_minute() -> u64 {
    50_000
}

fn default_key_prefix() -> String {
    "cortex:".to_owned()
}
