//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use cortex_config::{Config, DirectoryConfig, FallbackStrategyConfig, StaticClientConfig};
use indexmap::IndexMap;
use secrecy::SecretString;

use super::mock_llm::MockProvider;

/// Key of the regular client every builder starts with
pub const APP_KEY: &str = "sk-kinisi";

/// Key of the admin client every builder starts with
pub const ADMIN_KEY: &str = "sk-ops";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
    clients: IndexMap<String, StaticClientConfig>,
}

impl ConfigBuilder {
    /// One regular client, one admin client, millisecond retry backoff
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.retry.base_delay = Duration::from_millis(1);
        config.retry.max_delay = Duration::from_millis(5);

        let mut clients = IndexMap::new();
        clients.insert(APP_KEY.to_owned(), client("kinisi"));
        clients.insert(
            ADMIN_KEY.to_owned(),
            StaticClientConfig {
                admin: true,
                ..client("ops")
            },
        );

        Self { config, clients }
    }

    /// Point every provider at the mock
    pub fn with_mock(mut self, mock: &MockProvider) -> Self {
        let providers = &mut self.config.providers;

        providers.zai.url = Some(mock.url("/zai/chat/completions"));
        providers.zai.api_key = Some(SecretString::from("zai-test"));
        providers.anthropic.url = Some(mock.url("/anthropic/messages"));
        providers.anthropic.api_key = Some(SecretString::from("ant-test"));
        providers.openai.url = Some(mock.url("/openai/chat/completions"));
        providers.openai.api_key = Some(SecretString::from("oai-test"));
        providers.openrouter.url = Some(mock.url("/openrouter/chat/completions"));
        providers.openrouter.api_key = Some(SecretString::from("or-test"));

        self
    }

    /// Grant direct credits
    pub fn with_credits(mut self, anthropic: bool, openai: bool) -> Self {
        self.config.credits.anthropic = anthropic;
        self.config.credits.openai = openai;
        self
    }

    /// Add or replace a client
    pub fn with_client(mut self, key: &str, client: StaticClientConfig) -> Self {
        self.clients.insert(key.to_owned(), client);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.config.circuit_breaker.failure_threshold = threshold;
        self
    }

    pub fn without_breakers(mut self) -> Self {
        self.config.circuit_breaker.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(mut self) -> Config {
        self.config.directory = DirectoryConfig::Static { clients: self.clients };
        self.config
    }
}

/// A client with defaults for everything but its identity
pub fn client(app_id: &str) -> StaticClientConfig {
    StaticClientConfig {
        app_id: app_id.to_owned(),
        name: app_id.to_uppercase(),
        default_model: None,
        allow_zai: true,
        fallback_strategy: FallbackStrategyConfig::Openrouter,
        requests_per_minute: None,
        tokens_per_minute: None,
        admin: false,
    }
}
