//! Persisted token record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The stored side of an issued token.
///
/// The access token itself is a JWT and is not stored; the record
/// keeps its `jti` for revocation plus the refresh token, raw or
/// hashed but never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Unique record id.
    pub id: Uuid,

    /// The account the token was issued for.
    pub account_id: Uuid,

    /// The application the token was issued to.
    pub application_id: Uuid,

    /// The `jti` of the access token.
    pub jti: String,

    /// Raw refresh token, when hashing is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// SHA-256 hex of the refresh token, when hashing is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_hash: Option<String>,

    /// Space-separated scopes of the access token.
    pub scope: String,

    /// When the access token expires.
    pub expires_at: OffsetDateTime,

    /// When the record was created.
    pub created_at: OffsetDateTime,

    /// When the token was revoked, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<OffsetDateTime>,
}

impl TokenRecord {
    /// Returns `true` if the access token is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is still usable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}
