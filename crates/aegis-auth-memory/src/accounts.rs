//! In-memory account storage.

use std::collections::HashMap;

use aegis_auth::AuthResult;
use aegis_auth::storage::AccountStorage;
use aegis_auth::types::Account;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Accounts keyed by login.
#[derive(Default)]
pub struct MemoryAccountStorage {
    by_login: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStorage for MemoryAccountStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>> {
        Ok(self
            .by_login
            .read()
            .await
            .values()
            .find(|account| account.id == id)
            .cloned())
    }

    async fn find_by_login(&self, login: &str) -> AuthResult<Option<Account>> {
        Ok(self.by_login.read().await.get(login).cloned())
    }

    async fn find_or_create_by_login(&self, login: &str) -> AuthResult<Account> {
        let mut accounts = self.by_login.write().await;
        Ok(accounts
            .entry(login.to_string())
            .or_insert_with(|| Account::new(login))
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let storage = MemoryAccountStorage::new();

        let first = storage.find_or_create_by_login("u@example.com").await.unwrap();
        let second = storage.find_or_create_by_login("u@example.com").await.unwrap();
        assert_eq!(first.id, second.id);

        let other = storage.find_or_create_by_login("v@example.com").await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_lookup_paths_agree() {
        let storage = MemoryAccountStorage::new();
        let account = storage.find_or_create_by_login("u@example.com").await.unwrap();

        assert_eq!(
            storage.find_by_login("u@example.com").await.unwrap().unwrap().id,
            account.id
        );
        assert_eq!(
            storage.find_by_id(account.id).await.unwrap().unwrap().login,
            "u@example.com"
        );
        assert!(storage.find_by_login("missing").await.unwrap().is_none());
    }
}
