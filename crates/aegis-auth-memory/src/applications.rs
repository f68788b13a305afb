//! In-memory application registry.

use std::collections::HashMap;

use aegis_auth::AuthResult;
use aegis_auth::storage::ApplicationStorage;
use aegis_auth::types::Application;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Applications keyed by client id.
#[derive(Default)]
pub struct MemoryApplicationStorage {
    by_client_id: RwLock<HashMap<String, Application>>,
}

impl MemoryApplicationStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an application, replacing any previous registration
    /// under the same client id.
    pub async fn insert(&self, application: Application) {
        self.by_client_id
            .write()
            .await
            .insert(application.client_id.clone(), application);
    }
}

#[async_trait]
impl ApplicationStorage for MemoryApplicationStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Application>> {
        Ok(self.by_client_id.read().await.get(client_id).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Application>> {
        Ok(self
            .by_client_id
            .read()
            .await
            .values()
            .find(|application| application.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let storage = MemoryApplicationStorage::new();
        let application = Application::new("client-1", "App", vec!["read".to_string()]);
        storage.insert(application.clone()).await;

        assert_eq!(
            storage
                .find_by_client_id("client-1")
                .await
                .unwrap()
                .unwrap()
                .id,
            application.id
        );
        assert_eq!(
            storage
                .find_by_id(application.id)
                .await
                .unwrap()
                .unwrap()
                .client_id,
            "client-1"
        );
        assert!(storage.find_by_client_id("nobody").await.unwrap().is_none());
    }
}
