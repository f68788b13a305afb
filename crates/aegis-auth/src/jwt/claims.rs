//! Access token claims.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Computes the deterministic token id for an audience/issue-time
/// pair: the hex SHA-256 of `"{aud}:{iat}"`.
///
/// Verifiers recompute this value instead of consulting storage, so a
/// tampered `jti` is caught without a lookup.
#[must_use]
pub fn generate_jti(aud: &str, iat: i64) -> String {
    hex::encode(Sha256::digest(format!("{aud}:{iat}").as_bytes()))
}

/// Claims carried by minted access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (authorization server identity).
    pub iss: String,

    /// Subject (account id, or its pairwise hash).
    pub sub: String,

    /// Audience.
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Not before (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// JWT ID, derived from `aud` and `iat`.
    pub jti: String,

    /// Space-separated scopes.
    pub scope: String,

    /// OAuth client ID.
    pub client_id: String,

    /// When the account last authenticated, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
}

impl AccessTokenClaims {
    /// Creates a new builder for access token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> AccessTokenClaimsBuilder {
        AccessTokenClaimsBuilder::new(issuer, subject, client_id)
    }
}

/// Builder for `AccessTokenClaims`.
pub struct AccessTokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: Option<String>,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
    scope: String,
    client_id: String,
    auth_time: Option<i64>,
}

impl AccessTokenClaimsBuilder {
    fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: None,
            exp: now + 3600, // Default 1 hour
            iat: now,
            nbf: None,
            scope: String::new(),
            client_id: client_id.into(),
            auth_time: None,
        }
    }

    /// Sets the audience. Defaults to the client id.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Sets the issued-at timestamp, recomputing the expiry offset.
    #[must_use]
    pub fn issued_at(mut self, iat: i64) -> Self {
        let lifetime = self.exp - self.iat;
        self.iat = iat;
        self.exp = iat + lifetime;
        self
    }

    /// Sets the expiration time in seconds from the issue time.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Sets the not-before timestamp.
    #[must_use]
    pub fn not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Sets the scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the last-authentication timestamp.
    #[must_use]
    pub fn auth_time(mut self, auth_time: i64) -> Self {
        self.auth_time = Some(auth_time);
        self
    }

    /// Builds the access token claims.
    ///
    /// The audience defaults to the client id and the `jti` is derived
    /// from the final audience and issue time.
    #[must_use]
    pub fn build(self) -> AccessTokenClaims {
        let aud = self.aud.unwrap_or_else(|| self.client_id.clone());
        let jti = generate_jti(&aud, self.iat);
        AccessTokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud,
            exp: self.exp,
            iat: self.iat,
            nbf: self.nbf,
            jti,
            scope: self.scope,
            client_id: self.client_id,
            auth_time: self.auth_time,
        }
    }
}
