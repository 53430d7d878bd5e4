use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, DirectoryConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_breaker()?;
        self.validate_retry()?;
        self.validate_directory()?;
        Ok(())
    }

    fn validate_breaker(&self) -> anyhow::Result<()> {
        let breaker = &self.circuit_breaker;

        if breaker.failure_threshold == 0 {
            anyhow::bail!("circuit_breaker.failure_threshold must be at least 1");
        }

        if breaker.enforce_half_open_limit && breaker.half_open_max_calls == 0 {
            anyhow::bail!("circuit_breaker.half_open_max_calls must be at least 1 when the limit is enforced");
        }

        Ok(())
    }

    fn validate_retry(&self) -> anyhow::Result<()> {
        let retry = &self.retry;

        if retry.base_delay > retry.max_delay {
            anyhow::bail!("retry.base_delay must not exceed retry.max_delay");
        }

        if let Some(status) = retry.retryable_statuses.iter().find(|s| !(400..=599).contains(*s)) {
            anyhow::bail!("retry.retryable_statuses contains non-error status {status}");
        }

        Ok(())
    }

    fn validate_directory(&self) -> anyhow::Result<()> {
        match &self.directory {
            DirectoryConfig::Static { clients } => {
                if clients.keys().any(|key| key.trim().is_empty()) {
                    anyhow::bail!("directory.clients contains an empty API key");
                }
            }
            DirectoryConfig::Remote(remote) => {
                if remote.secret.expose_secret().is_empty() {
                    anyhow::bail!("directory.secret must not be empty");
                }
                if remote.cache_capacity > 1_000_000 {
                    anyhow::bail!("directory.cache_capacity exceeds maximum of 1,000,000");
                }
            }
        }

        Ok(())
    }
}
