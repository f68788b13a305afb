//! Grant storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Grant;

/// Storage for authorization grants.
#[async_trait]
pub trait GrantStorage: Send + Sync {
    /// Persists a new grant.
    async fn create(&self, grant: Grant) -> AuthResult<Grant>;

    /// Marks the grant as used and returns it, or `None` if it does
    /// not exist, is expired, or was already consumed.
    async fn consume(&self, id: Uuid) -> AuthResult<Option<Grant>>;
}
