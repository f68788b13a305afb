//! Application storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Application;

/// Storage for registered OAuth applications.
#[async_trait]
pub trait ApplicationStorage: Send + Sync {
    /// Finds an application by its OAuth client id.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Application>>;

    /// Finds an application by its record id.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Application>>;
}
