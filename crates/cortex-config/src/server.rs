use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::cors::CorsConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Upper bound on producing a response, including every retry and backoff
    #[serde(default = "default_request_timeout", deserialize_with = "crate::duration::deserialize")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            request_timeout: default_request_timeout(),
            cors: None,
        }
    }
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}
