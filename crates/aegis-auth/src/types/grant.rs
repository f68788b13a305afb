//! Authorization grant record.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A recorded authorization, exchangeable once for tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Unique grant id.
    pub id: Uuid,

    /// The authorizing account.
    pub account_id: Uuid,

    /// The application the grant was issued to.
    pub application_id: Uuid,

    /// Scopes the account approved.
    pub scopes: Vec<String>,

    /// When the grant was created.
    pub created_at: OffsetDateTime,

    /// When the grant stops being exchangeable.
    pub expires_at: OffsetDateTime,

    /// When the grant was exchanged, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<OffsetDateTime>,
}

impl Grant {
    /// Creates a new grant valid for `lifetime`.
    #[must_use]
    pub fn new(
        account_id: Uuid,
        application_id: Uuid,
        scopes: Vec<String>,
        lifetime: Duration,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            account_id,
            application_id,
            scopes,
            created_at: now,
            expires_at: now + lifetime,
            used_at: None,
        }
    }

    /// Returns `true` if the grant is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if the grant has already been exchanged.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}
