//! JTI replay prevention storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;

/// Storage for one-time JWT ids.
///
/// Client assertions carry caller-chosen `jti` values; marking them
/// used prevents an intercepted assertion from being replayed within
/// its validity window.
#[async_trait]
pub trait JtiStorage: Send + Sync {
    /// Records `jti` as used until `expires_at`.
    ///
    /// Returns `true` if the jti was fresh, `false` if it was already
    /// used.
    async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> AuthResult<bool>;
}
