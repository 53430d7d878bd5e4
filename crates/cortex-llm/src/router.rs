//! Provider selection for a requested model

use cortex_auth::{ClientPolicy, FallbackStrategy};
use cortex_config::{CreditFlags, ProvidersConfig};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::LlmError;
use crate::provider::ProviderKind;

const ZAI_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Where one request goes and how it authenticates
#[derive(Debug, Clone)]
pub struct ProviderRoute {
    pub provider: ProviderKind,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Pick a provider, first matching rule wins
///
/// 1. `glm` anywhere or a `z-ai` prefix goes to Z.ai unconditionally.
/// 2. `claude` with Anthropic credits goes direct.
/// 3. `gpt` anywhere or an `o1` prefix with `OpenAI` credits goes direct.
/// 4. Otherwise the client's fallback strategy decides.
pub fn select_provider(
    model: &str,
    fallback: FallbackStrategy,
    credits: CreditFlags,
) -> Result<ProviderKind, LlmError> {
    if model.contains("glm") || model.starts_with("z-ai") {
        return Ok(ProviderKind::Zai);
    }

    if model.contains("claude") && credits.anthropic {
        return Ok(ProviderKind::Anthropic);
    }

    if (model.contains("gpt") || model.starts_with("o1")) && credits.openai {
        return Ok(ProviderKind::OpenAi);
    }

    match fallback {
        FallbackStrategy::FailFast => Err(LlmError::PaymentRequired),
        FallbackStrategy::Openrouter => Ok(ProviderKind::OpenRouter),
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    url: Url,
    headers: HeaderMap,
}

/// Routing table built once from configuration
#[derive(Debug, Clone)]
pub struct ProviderRouter {
    zai: Endpoint,
    anthropic: Endpoint,
    openai: Endpoint,
    openrouter: Endpoint,
    credits: CreditFlags,
}

impl ProviderRouter {
    pub fn from_config(providers: &ProvidersConfig, credits: CreditFlags) -> Result<Self, LlmError> {
        let zai = Endpoint {
            url: endpoint_url(providers.zai.url.as_ref(), ZAI_URL)?,
            headers: bearer_headers(ProviderKind::Zai, providers.zai.api_key.as_ref())?,
        };

        let mut anthropic_headers = json_headers();
        if let Some(key) = &providers.anthropic.api_key {
            anthropic_headers.insert(
                HeaderName::from_static("x-api-key"),
                secret_header(ProviderKind::Anthropic, key)?,
            );
        } else {
            tracing::warn!(provider = %ProviderKind::Anthropic, "no API key configured");
        }
        anthropic_headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        let anthropic = Endpoint {
            url: endpoint_url(providers.anthropic.url.as_ref(), ANTHROPIC_URL)?,
            headers: anthropic_headers,
        };

        let openai = Endpoint {
            url: endpoint_url(providers.openai.url.as_ref(), OPENAI_URL)?,
            headers: bearer_headers(ProviderKind::OpenAi, providers.openai.api_key.as_ref())?,
        };

        let openrouter_config = &providers.openrouter;
        let mut openrouter_headers = bearer_headers(ProviderKind::OpenRouter, openrouter_config.api_key.as_ref())?;
        openrouter_headers.insert(
            HeaderName::from_static("http-referer"),
            plain_header("openrouter.referer", &openrouter_config.referer)?,
        );
        openrouter_headers.insert(
            HeaderName::from_static("x-title"),
            plain_header("openrouter.title", &openrouter_config.title)?,
        );
        let openrouter = Endpoint {
            url: endpoint_url(openrouter_config.url.as_ref(), OPENROUTER_URL)?,
            headers: openrouter_headers,
        };

        Ok(Self {
            zai,
            anthropic,
            openai,
            openrouter,
            credits,
        })
    }

    /// Resolve the route for `model` under `policy`
    pub fn route(&self, model: &str, policy: &ClientPolicy) -> Result<ProviderRoute, LlmError> {
        let provider = select_provider(model, policy.fallback_strategy, self.credits)?;

        let endpoint = match provider {
            ProviderKind::Zai => &self.zai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
        };

        Ok(ProviderRoute {
            provider,
            url: endpoint.url.clone(),
            headers: endpoint.headers.clone(),
        })
    }
}

fn endpoint_url(configured: Option<&Url>, default: &str) -> Result<Url, LlmError> {
    match configured {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| LlmError::Internal(format!("invalid default endpoint {default}: {e}"))),
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn bearer_headers(provider: ProviderKind, key: Option<&SecretString>) -> Result<HeaderMap, LlmError> {
    let mut headers = json_headers();

    match key {
        Some(key) => {
            let value = format!("Bearer {}", key.expose_secret());
            let mut value = HeaderValue::from_str(&value)
                .map_err(|_| LlmError::Internal(format!("API key for {provider} is not a valid header value")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        None => tracing::warn!(%provider, "no API key configured"),
    }

    Ok(headers)
}

fn secret_header(provider: ProviderKind, key: &SecretString) -> Result<HeaderValue, LlmError> {
    let mut value = HeaderValue::from_str(key.expose_secret())
        .map_err(|_| LlmError::Internal(format!("API key for {provider} is not a valid header value")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn plain_header(field: &str, value: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value).map_err(|_| LlmError::Internal(format!("providers.{field} is not a valid header value")))
}

#[cfg(test)]
mod tests {
    use cortex_auth::RateLimitPolicy;
    use cortex_config::{OpenRouterConfig, ProviderConfig};

    use super::*;

    const ALL_CREDITS: CreditFlags = CreditFlags {
        anthropic: true,
        openai: true,
    };
    const NO_CREDITS: CreditFlags = CreditFlags {
        anthropic: false,
        openai: false,
    };

    fn policy(fallback: FallbackStrategy) -> ClientPolicy {
        ClientPolicy {
            app_id: "kinisi".to_owned(),
            name: "Kinisi".to_owned(),
            default_model: None,
            allow_zai: true,
            fallback_strategy: fallback,
            rate_limit: RateLimitPolicy::default(),
            admin: false,
        }
    }

    fn providers() -> ProvidersConfig {
        ProvidersConfig {
            zai: ProviderConfig {
                api_key: Some(SecretString::from("zai-key")),
                url: None,
            },
            anthropic: ProviderConfig {
                api_key: Some(SecretString::from("sk-ant")),
                url: None,
            },
            openai: ProviderConfig {
                api_key: Some(SecretString::from("sk-openai")),
                url: Some(Url::parse("http://127.0.0.1:9999/v1/chat/completions").unwrap()),
            },
            openrouter: OpenRouterConfig {
                api_key: Some(SecretString::from("sk-or")),
                ..OpenRouterConfig::default()
            },
        }
    }

    #[test]
    fn glm_goes_to_zai_even_with_every_credit() {
        for model in ["glm-4-plus", "glm-4", "z-ai/flash", "my-glm-tune"] {
            assert_eq!(
                select_provider(model, FallbackStrategy::FailFast, ALL_CREDITS).unwrap(),
                ProviderKind::Zai
            );
        }
    }

    #[test]
    fn claude_routes_on_credits_then_fallback() {
        let direct = select_provider("claude-3-5-sonnet", FallbackStrategy::Openrouter, ALL_CREDITS).unwrap();
        assert_eq!(direct, ProviderKind::Anthropic);

        let fallback = select_provider("claude-3-5-sonnet", FallbackStrategy::Openrouter, NO_CREDITS).unwrap();
        assert_eq!(fallback, ProviderKind::OpenRouter);

        let refused = select_provider("claude-3-5-sonnet", FallbackStrategy::FailFast, NO_CREDITS);
        assert!(matches!(refused, Err(LlmError::PaymentRequired)));
    }

    #[test]
    fn gpt_and_o1_need_openai_credits() {
        let credits = CreditFlags {
            anthropic: false,
            openai: true,
        };
        assert_eq!(
            select_provider("gpt-4o", FallbackStrategy::Openrouter, credits).unwrap(),
            ProviderKind::OpenAi
        );
        assert_eq!(
            select_provider("o1-preview", FallbackStrategy::Openrouter, credits).unwrap(),
            ProviderKind::OpenAi
        );
        // Anthropic credits do not cover gpt
        assert_eq!(
            select_provider("gpt-4o", FallbackStrategy::Openrouter, CreditFlags { anthropic: true, openai: false })
                .unwrap(),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn unknown_model_follows_fallback() {
        assert_eq!(
            select_provider("mistral-large", FallbackStrategy::Openrouter, ALL_CREDITS).unwrap(),
            ProviderKind::OpenRouter
        );
        assert!(select_provider("mistral-large", FallbackStrategy::FailFast, ALL_CREDITS).is_err());
    }

    #[test]
    fn anthropic_route_uses_key_header_and_version() {
        let router = ProviderRouter::from_config(&providers(), ALL_CREDITS).unwrap();
        let route = router.route("claude-3-haiku", &policy(FallbackStrategy::Openrouter)).unwrap();

        assert_eq!(route.provider, ProviderKind::Anthropic);
        assert_eq!(route.url.as_str(), ANTHROPIC_URL);
        assert_eq!(route.headers["x-api-key"], "sk-ant");
        assert_eq!(route.headers["anthropic-version"], ANTHROPIC_VERSION);
        assert_eq!(route.headers[CONTENT_TYPE], "application/json");
        assert!(!route.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn openrouter_route_identifies_the_app() {
        let router = ProviderRouter::from_config(&providers(), NO_CREDITS).unwrap();
        let route = router.route("claude-3-haiku", &policy(FallbackStrategy::Openrouter)).unwrap();

        assert_eq!(route.provider, ProviderKind::OpenRouter);
        assert_eq!(route.headers[AUTHORIZATION], "Bearer sk-or");
        assert_eq!(route.headers["http-referer"], "https://cortex.corvolabs.com");
        assert_eq!(route.headers["x-title"], "Corvo Cortex");
    }

    #[test]
    fn configured_url_overrides_default() {
        let router = ProviderRouter::from_config(&providers(), ALL_CREDITS).unwrap();
        let route = router.route("gpt-4o", &policy(FallbackStrategy::Openrouter)).unwrap();

        assert_eq!(route.url.as_str(), "http://127.0.0.1:9999/v1/chat/completions");
        assert_eq!(route.headers[AUTHORIZATION], "Bearer sk-openai");
    }

    #[test]
    fn fail_fast_client_gets_payment_required() {
        let router = ProviderRouter::from_config(&providers(), NO_CREDITS).unwrap();
        let err = router.route("gpt-4o", &policy(FallbackStrategy::FailFast)).unwrap_err();

        assert!(matches!(err, LlmError::PaymentRequired));
    }
}
