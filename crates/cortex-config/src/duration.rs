use std::time::Duration;

use serde::{Deserialize, Deserializer, de};

/// Deserialize a human-readable duration such as `"100ms"` or `"60s"`
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
