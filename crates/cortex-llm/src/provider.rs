use std::fmt;

/// The closed set of upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Z.ai GLM endpoint
    Zai,
    /// Anthropic Messages API
    Anthropic,
    /// `OpenAI` chat completions
    OpenAi,
    /// `OpenRouter` aggregator
    OpenRouter,
}

impl ProviderKind {
    pub const ALL: [Self; 4] = [Self::Zai, Self::Anthropic, Self::OpenAi, Self::OpenRouter];

    /// Look up a provider by its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// Provider key used for breakers, telemetry and error details
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zai => "z-ai-pro",
            Self::Anthropic => "anthropic-direct",
            Self::OpenAi => "openai-direct",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_key(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::from_key("openrouter"), Some(ProviderKind::OpenRouter));
        assert_eq!(ProviderKind::from_key("OpenRouter"), None);
        assert_eq!(ProviderKind::from_key("mistral"), None);
    }
}
