//! In-memory grant storage.

use std::collections::HashMap;

use aegis_auth::AuthResult;
use aegis_auth::storage::GrantStorage;
use aegis_auth::types::Grant;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Grants keyed by id.
#[derive(Default)]
pub struct MemoryGrantStorage {
    grants: RwLock<HashMap<Uuid, Grant>>,
}

impl MemoryGrantStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStorage for MemoryGrantStorage {
    async fn create(&self, grant: Grant) -> AuthResult<Grant> {
        self.grants.write().await.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn consume(&self, id: Uuid) -> AuthResult<Option<Grant>> {
        let mut grants = self.grants.write().await;
        let Some(grant) = grants.get_mut(&id) else {
            return Ok(None);
        };
        if grant.is_used() || grant.is_expired() {
            return Ok(None);
        }
        grant.used_at = Some(OffsetDateTime::now_utc());
        Ok(Some(grant.clone()))
    }
}
