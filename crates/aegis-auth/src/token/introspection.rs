//! Token introspection.
//!
//! Produces the RFC 7662 payload for a presented token. JWT access
//! tokens are answered from their verified claims; opaque values
//! (refresh tokens) defer to the storage lookup path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::jwt::{AccessTokenClaims, DecodeOptions, JwtCodec};
use crate::storage::{ApplicationStorage, TokenStorage};
use crate::token::issuer::hash_token;
use crate::types::TokenRecord;
use crate::AuthResult;

/// RFC 7662 introspection response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionPayload {
    /// Whether the token is currently usable.
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl IntrospectionPayload {
    /// The response for an unknown or unusable token.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            token_type: None,
            exp: None,
            iat: None,
            nbf: None,
            sub: None,
            aud: None,
            iss: None,
            jti: None,
        }
    }

    /// Builds the payload for verified access token claims.
    #[must_use]
    pub fn from_claims(claims: &AccessTokenClaims) -> Self {
        Self {
            active: true,
            scope: Some(claims.scope.clone()),
            client_id: Some(claims.client_id.clone()),
            token_type: Some("Bearer".to_string()),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            nbf: claims.nbf,
            sub: Some(claims.sub.clone()),
            aud: Some(claims.aud.clone()),
            iss: Some(claims.iss.clone()),
            jti: Some(claims.jti.clone()),
        }
    }

    /// Builds the payload for a stored token record.
    #[must_use]
    pub fn from_record(record: &TokenRecord, client_id: Option<String>) -> Self {
        Self {
            active: record.is_active(),
            scope: Some(record.scope.clone()),
            client_id,
            token_type: Some("Bearer".to_string()),
            exp: Some(record.expires_at.unix_timestamp()),
            iat: Some(record.created_at.unix_timestamp()),
            nbf: None,
            sub: Some(record.account_id.to_string()),
            aud: None,
            iss: None,
            jti: Some(record.jti.clone()),
        }
    }
}

/// Answers introspection requests.
pub struct Introspector {
    codec: Arc<JwtCodec>,
    tokens: Arc<dyn TokenStorage>,
    applications: Arc<dyn ApplicationStorage>,
}

impl Introspector {
    /// Creates a new introspector.
    #[must_use]
    pub fn new(
        codec: Arc<JwtCodec>,
        tokens: Arc<dyn TokenStorage>,
        applications: Arc<dyn ApplicationStorage>,
    ) -> Self {
        Self {
            codec,
            tokens,
            applications,
        }
    }

    /// Introspects a presented token value.
    ///
    /// Never errs on an invalid token; unknown values answer
    /// `active: false`.
    pub async fn introspect(&self, token: &str) -> AuthResult<IntrospectionPayload> {
        // JWT path: verified claims answer directly. Expiry is part
        // of the answer, so decode ignores it and revocation is
        // checked against storage.
        if let Some(claims) = self
            .codec
            .decode(token, &DecodeOptions::new().with_verify_exp(false))
            .await
        {
            let revoked = self
                .tokens
                .find_by_jti(&claims.jti)
                .await?
                .is_some_and(|record| record.is_revoked());
            let expired = claims.exp <= time::OffsetDateTime::now_utc().unix_timestamp();

            let mut payload = IntrospectionPayload::from_claims(&claims);
            payload.active = !revoked && !expired;
            return Ok(payload);
        }

        // Opaque path: refresh tokens, stored raw or hashed.
        let record = match self.tokens.find_by_refresh_token(token).await? {
            Some(record) => Some(record),
            None => self.tokens.find_by_refresh_token(&hash_token(token)).await?,
        };

        match record {
            Some(record) => {
                let client_id = self
                    .applications
                    .find_by_id(record.application_id)
                    .await?
                    .map(|app| app.client_id);
                Ok(IntrospectionPayload::from_record(&record, client_id))
            }
            None => Ok(IntrospectionPayload::inactive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_payload_serializes_minimal() {
        let json = serde_json::to_value(IntrospectionPayload::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "active": false }));
    }

    #[test]
    fn test_payload_from_claims() {
        let claims =
            AccessTokenClaims::builder("https://auth.example.com", "acct-1", "client-1")
                .scope("read")
                .build();
        let payload = IntrospectionPayload::from_claims(&claims);

        assert!(payload.active);
        assert_eq!(payload.scope.as_deref(), Some("read"));
        assert_eq!(payload.client_id.as_deref(), Some("client-1"));
        assert_eq!(payload.token_type.as_deref(), Some("Bearer"));
        assert_eq!(payload.iss.as_deref(), Some("https://auth.example.com"));
        assert_eq!(payload.jti.as_deref(), Some(claims.jti.as_str()));
    }
}
