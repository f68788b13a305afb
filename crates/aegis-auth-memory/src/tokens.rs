//! In-memory token record storage.
//!
//! Enforces the uniqueness the issuer relies on: a second record with
//! the same `jti` or the same stored refresh token value fails as a
//! unique violation, like a database constraint would.

use std::collections::HashMap;

use aegis_auth::storage::TokenStorage;
use aegis_auth::types::TokenRecord;
use aegis_auth::{AuthError, AuthResult};
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Token records keyed by id.
#[derive(Default)]
pub struct MemoryTokenStorage {
    records: RwLock<HashMap<Uuid, TokenRecord>>,
}

impl MemoryTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The stored refresh token value, raw or hashed.
fn stored_refresh(record: &TokenRecord) -> Option<&str> {
    record
        .refresh_token
        .as_deref()
        .or(record.refresh_token_hash.as_deref())
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn create(&self, record: TokenRecord) -> AuthResult<TokenRecord> {
        let mut records = self.records.write().await;

        if records.values().any(|existing| existing.jti == record.jti) {
            return Err(AuthError::unique_violation("jti"));
        }
        if let Some(refresh) = stored_refresh(&record)
            && records
                .values()
                .any(|existing| stored_refresh(existing) == Some(refresh))
        {
            return Err(AuthError::unique_violation("refresh_token"));
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_jti(&self, jti: &str) -> AuthResult<Option<TokenRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| record.jti == jti)
            .cloned())
    }

    async fn find_by_refresh_token(&self, stored: &str) -> AuthResult<Option<TokenRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| stored_refresh(record) == Some(stored))
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> AuthResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) => {
                record.revoked_at = Some(OffsetDateTime::now_utc());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn record(jti: &str, refresh_hash: Option<&str>) -> TokenRecord {
        let now = OffsetDateTime::now_utc();
        TokenRecord {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            jti: jti.to_string(),
            refresh_token: None,
            refresh_token_hash: refresh_hash.map(str::to_string),
            scope: "read".to_string(),
            expires_at: now + Duration::hours(1),
            created_at: now,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_jti_rejected() {
        let storage = MemoryTokenStorage::new();
        storage.create(record("jti-1", None)).await.unwrap();

        let err = storage.create(record("jti-1", None)).await.unwrap_err();
        assert!(matches!(err, AuthError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_refresh_token_rejected() {
        let storage = MemoryTokenStorage::new();
        storage.create(record("jti-1", Some("hash-1"))).await.unwrap();

        let err = storage
            .create(record("jti-2", Some("hash-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UniqueViolation { .. }));

        // A distinct refresh value is fine.
        assert!(storage.create(record("jti-3", Some("hash-2"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_and_revoke() {
        let storage = MemoryTokenStorage::new();
        let created = storage.create(record("jti-1", Some("hash-1"))).await.unwrap();

        let found = storage.find_by_jti("jti-1").await.unwrap().unwrap();
        assert!(found.is_active());
        assert_eq!(
            storage
                .find_by_refresh_token("hash-1")
                .await
                .unwrap()
                .unwrap()
                .id,
            created.id
        );

        assert!(storage.revoke(created.id).await.unwrap());
        let revoked = storage.find_by_jti("jti-1").await.unwrap().unwrap();
        assert!(revoked.is_revoked());
        assert!(!revoked.is_active());

        assert!(!storage.revoke(Uuid::new_v4()).await.unwrap());
    }
}
