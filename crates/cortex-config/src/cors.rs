use serde::Deserialize;

/// CORS configuration
///
/// An empty `[server.cors]` table allows any origin, method and header.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (wildcard "*" or explicit list)
    #[serde(default)]
    pub origins: AnyOrList,
    /// Allowed HTTP methods (wildcard "*" or explicit list)
    #[serde(default)]
    pub methods: AnyOrList,
    /// Allowed request headers (wildcard "*" or explicit list)
    #[serde(default)]
    pub headers: AnyOrList,
    /// Response headers exposed to the browser
    #[serde(default = "default_expose_headers")]
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: AnyOrList::Any,
            methods: AnyOrList::Any,
            headers: AnyOrList::Any,
            expose_headers: default_expose_headers(),
            max_age: None,
        }
    }
}

/// Either a wildcard `"*"` or an explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnyOrList {
    #[default]
    Any,
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for AnyOrList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        let values = match Raw::deserialize(deserializer)? {
            Raw::One(value) => vec![value],
            Raw::Many(values) => values,
        };

        if values.iter().any(|v| v == "*") {
            Ok(Self::Any)
        } else {
            Ok(Self::List(values))
        }
    }
}

fn default_expose_headers() -> Vec<String> {
    ["RateLimit-Limit", "RateLimit-Remaining", "RateLimit-Reset", "RateLimit-Used"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
