//! In-memory assertion `jti` tracking.

use std::collections::HashMap;

use aegis_auth::AuthResult;
use aegis_auth::storage::JtiStorage;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// Used assertion ids, pruned lazily once expired.
#[derive(Default)]
pub struct MemoryJtiStorage {
    used: RwLock<HashMap<String, OffsetDateTime>>,
}

impl MemoryJtiStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JtiStorage for MemoryJtiStorage {
    async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> AuthResult<bool> {
        let now = OffsetDateTime::now_utc();
        let mut used = self.used.write().await;
        used.retain(|_, expiry| *expiry > now);

        if used.contains_key(jti) {
            return Ok(false);
        }
        used.insert(jti.to_string(), expires_at);
        Ok(true)
    }
}
