//! Account storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Account;

/// Storage for end-user accounts.
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Finds an account by its record id.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Account>>;

    /// Finds an account by login.
    async fn find_by_login(&self, login: &str) -> AuthResult<Option<Account>>;

    /// Returns the account for `login`, creating it if absent.
    ///
    /// Must be idempotent: concurrent calls for the same login yield
    /// the same account.
    async fn find_or_create_by_login(&self, login: &str) -> AuthResult<Account>;
}
