use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Where client policies are resolved from
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum DirectoryConfig {
    /// Policies declared inline, keyed by API key
    Static {
        #[serde(default)]
        clients: IndexMap<String, StaticClientConfig>,
    },
    /// Policies resolved over HTTP from a directory service
    Remote(RemoteDirectoryConfig),
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::Static {
            clients: IndexMap::new(),
        }
    }
}

/// A client declared in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticClientConfig {
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default = "default_allow_zai")]
    pub allow_zai: bool,
    #[serde(default)]
    pub fallback_strategy: FallbackStrategyConfig,
    #[serde(default)]
    pub requests_per_minute: Option<u64>,
    #[serde(default)]
    pub tokens_per_minute: Option<u64>,
    #[serde(default)]
    pub admin: bool,
}

/// Behaviour when no direct credits cover the requested model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategyConfig {
    #[default]
    Openrouter,
    FailFast,
}

/// Remote directory service settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteDirectoryConfig {
    /// Base URL of the directory service
    pub url: Url,
    /// Shared secret sent as `X-Gateway-Secret`
    pub secret: SecretString,
    /// How long a resolved policy is reused
    #[serde(default = "default_cache_ttl", deserialize_with = "crate::duration::deserialize")]
    pub cache_ttl: Duration,
    /// Maximum number of cached policies
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_allow_zai() -> bool {
    true
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

const fn default_cache_capacity() -> u64 {
    10_000
}
