//! Client policy lookup for Cortex
//!
//! The gateway treats the client directory as an external collaborator:
//! given an API key it returns the caller's [`ClientPolicy`] or nothing.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod directory;
mod error;
mod policy;
mod remote;

use std::sync::Arc;

use cortex_config::{Config, DirectoryConfig};

pub use directory::{ClientDirectory, StaticDirectory};
pub use error::AuthError;
pub use policy::{ClientPolicy, FallbackStrategy, RateLimitPolicy};
pub use remote::RemoteDirectory;

/// Build the configured client directory
pub fn build_directory(config: &Config) -> anyhow::Result<Arc<dyn ClientDirectory>> {
    let directory: Arc<dyn ClientDirectory> = match &config.directory {
        DirectoryConfig::Static { clients } => Arc::new(StaticDirectory::from_config(clients, &config.rate_limit)),
        DirectoryConfig::Remote(remote) => Arc::new(RemoteDirectory::new(remote)?),
    };

    Ok(directory)
}
