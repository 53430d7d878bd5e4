use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Credentials and endpoint overrides for every upstream provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Z.ai (GLM) aggregator endpoint
    #[serde(default)]
    pub zai: ProviderConfig,
    /// Anthropic Messages API
    #[serde(default)]
    pub anthropic: ProviderConfig,
    /// `OpenAI` chat completions API
    #[serde(default)]
    pub openai: ProviderConfig,
    /// `OpenRouter` aggregator
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// A single upstream provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key sent with every upstream request
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Full chat endpoint URL, overriding the public default
    #[serde(default)]
    pub url: Option<Url>,
}

/// `OpenRouter` additionally identifies the calling application
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub url: Option<Url>,
    /// Sent as `HTTP-Referer`
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Sent as `X-Title`
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: None,
            referer: default_referer(),
            title: default_title(),
        }
    }
}

/// Whether direct (non-aggregator) credits are available per vendor
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditFlags {
    #[serde(default)]
    pub anthropic: bool,
    #[serde(default)]
    pub openai: bool,
}

fn default_referer() -> String {
    "https://cortex.corvolabs.com".to_owned()
}

fn default_title() -> String {
    "Corvo Cortex".to_owned()
}
