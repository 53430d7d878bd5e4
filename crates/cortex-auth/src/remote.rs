use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cortex_config::RemoteDirectoryConfig;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::{AuthError, ClientDirectory, ClientPolicy};

/// Resolves client policies from a directory service, caching hits
///
/// Unknown keys are not cached so that newly provisioned clients are
/// usable immediately.
#[derive(Clone)]
pub struct RemoteDirectory {
    http: reqwest::Client,
    url: url::Url,
    secret: SecretString,
    cache: Cache<String, Arc<ClientPolicy>>,
}

impl RemoteDirectory {
    /// Create a new remote directory client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &RemoteDirectoryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

        let cache = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();

        Ok(Self {
            http,
            url: config.url.clone(),
            secret: config.secret.clone(),
            cache,
        })
    }

    /// Drop a cached policy (e.g. after the key is revoked)
    pub fn invalidate(&self, api_key: &str) {
        self.cache.invalidate(&sha256_hex(api_key));
    }

    async fn fetch(&self, api_key: &str) -> Result<Option<ClientPolicy>, AuthError> {
        let url = self.url.join("/internal/resolve-key").map_err(|e| AuthError::Directory {
            status: 0,
            message: e.to_string(),
        })?;

        let response = self
            .http
            .post(url)
            .header("X-Gateway-Secret", self.secret.expose_secret())
            .json(&serde_json::json!({ "key": api_key }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Directory {
                status: status.as_u16(),
                message,
            });
        }

        let policy = response.json().await.map_err(|e| AuthError::Directory {
            status: status.as_u16(),
            message: format!("failed to parse client policy: {e}"),
        })?;

        Ok(Some(policy))
    }
}

#[async_trait]
impl ClientDirectory for RemoteDirectory {
    async fn get(&self, api_key: &str) -> Result<Option<Arc<ClientPolicy>>, AuthError> {
        let cache_key = sha256_hex(api_key);

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(Some(cached));
        }

        let Some(policy) = self.fetch(api_key).await? else {
            tracing::debug!("directory does not know the presented key");
            return Ok(None);
        };

        let policy = Arc::new(policy);
        self.cache.insert(cache_key, Arc::clone(&policy));

        Ok(Some(policy))
    }
}

/// Hex SHA-256 of an API key, so raw keys never sit in the cache
fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}
