use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cortex_config::{RateLimitConfig, StaticClientConfig};
use indexmap::IndexMap;

use crate::{AuthError, ClientPolicy};

/// Resolves API keys to client policies
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Look up the policy for an API key, `None` when the key is unknown
    async fn get(&self, api_key: &str) -> Result<Option<Arc<ClientPolicy>>, AuthError>;

    /// Keys this directory can enumerate
    ///
    /// Directories backed by an external service cannot list their clients
    /// and return an empty list.
    fn known_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Client policies declared in configuration
pub struct StaticDirectory {
    clients: HashMap<String, Arc<ClientPolicy>>,
    order: Vec<String>,
}

impl StaticDirectory {
    /// Build from the `[directory.clients]` table
    pub fn from_config(clients: &IndexMap<String, StaticClientConfig>, limits: &RateLimitConfig) -> Self {
        let order = clients.keys().cloned().collect();
        let clients = clients
            .iter()
            .map(|(key, client)| (key.clone(), Arc::new(ClientPolicy::from_config(client, limits))))
            .collect();

        Self { clients, order }
    }

    /// Build directly from resolved policies
    pub fn from_policies(policies: impl IntoIterator<Item = (String, ClientPolicy)>) -> Self {
        let mut clients = HashMap::new();
        let mut order = Vec::new();

        for (key, policy) in policies {
            order.push(key.clone());
            clients.insert(key, Arc::new(policy));
        }

        Self { clients, order }
    }
}

#[async_trait]
impl ClientDirectory for StaticDirectory {
    async fn get(&self, api_key: &str) -> Result<Option<Arc<ClientPolicy>>, AuthError> {
        Ok(self.clients.get(api_key).cloned())
    }

    fn known_keys(&self) -> Vec<String> {
        self.order.clone()
    }
}
