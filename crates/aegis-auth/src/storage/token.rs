//! Token record storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::TokenRecord;

/// Storage for issued token records.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Persists a new token record.
    ///
    /// Implementations must surface [`crate::AuthError::UniqueViolation`]
    /// when the `jti` or refresh token collides with an existing
    /// record, so the issuer can retry with fresh values.
    async fn create(&self, record: TokenRecord) -> AuthResult<TokenRecord>;

    /// Finds a record by the access token's `jti`.
    async fn find_by_jti(&self, jti: &str) -> AuthResult<Option<TokenRecord>>;

    /// Finds a record by its stored refresh token value, raw or
    /// hashed as the issuer stored it.
    async fn find_by_refresh_token(&self, stored: &str) -> AuthResult<Option<TokenRecord>>;

    /// Revokes a record.
    async fn revoke(&self, id: Uuid) -> AuthResult<bool>;
}
