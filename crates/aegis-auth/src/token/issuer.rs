//! Access token issuance.
//!
//! [`TokenIssuer`] turns an authenticated account/application pair
//! into a signed access token plus its stored record. All claim
//! values are computed before the single signing call, so a token is
//! never minted from a half-built claim set.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{AuthConfig, SubjectType};
use crate::error::AuthError;
use crate::jwt::{AccessTokenClaims, JwtCodec};
use crate::storage::TokenStorage;
use crate::types::{Account, Application, TokenRecord};
use crate::AuthResult;

/// Bytes of entropy in a refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// A freshly issued token with its wire and stored representations.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed (and possibly encrypted) access token.
    pub access_token: String,

    /// Always `bearer`.
    pub token_type: &'static str,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// The raw refresh token, handed to the client exactly once.
    pub refresh_token: Option<String>,

    /// Space-separated granted scopes.
    pub scope: String,

    /// The claims the access token carries.
    pub claims: AccessTokenClaims,

    /// The persisted record.
    pub record: TokenRecord,
}

/// Issues access tokens for authenticated grants.
pub struct TokenIssuer {
    config: Arc<AuthConfig>,
    codec: Arc<JwtCodec>,
    tokens: Arc<dyn TokenStorage>,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(config: Arc<AuthConfig>, codec: Arc<JwtCodec>, tokens: Arc<dyn TokenStorage>) -> Self {
        Self {
            config,
            codec,
            tokens,
        }
    }

    /// Issues an access token for `account` on behalf of `application`.
    ///
    /// Empty `scopes` grants the application's full allowed set. A
    /// storage uniqueness collision is retried once with fresh values
    /// before surfacing as `invalid_request`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_scope` when a requested scope exceeds the
    /// application's allowed set, [`AuthError::Configuration`] when
    /// the subject cannot be derived, and storage errors verbatim.
    pub async fn issue(
        &self,
        account: &Account,
        application: &Application,
        scopes: &[String],
        issue_refresh: bool,
    ) -> AuthResult<IssuedToken> {
        let granted = self.resolve_scopes(application, scopes)?;
        let subject = self.subject_for(account, application)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .issue_once(account, application, &subject, &granted, issue_refresh)
                .await
            {
                Err(AuthError::UniqueViolation { .. }) if attempts == 1 => {
                    tracing::warn!("token uniqueness collision, retrying once");
                }
                Err(AuthError::UniqueViolation { .. }) => {
                    return Err(AuthError::invalid_request("error generating unique token"));
                }
                other => return other,
            }
        }
    }

    /// One issuance attempt: build claims, persist, sign.
    async fn issue_once(
        &self,
        account: &Account,
        application: &Application,
        subject: &str,
        scopes: &[String],
        issue_refresh: bool,
    ) -> AuthResult<IssuedToken> {
        let now = OffsetDateTime::now_utc();
        let lifetime = self.config.token_lifetime.whole_seconds();
        let scope = scopes.join(" ");

        let mut builder =
            AccessTokenClaims::builder(&self.config.issuer, subject, &application.client_id)
                .issued_at(now.unix_timestamp())
                .expires_in_seconds(lifetime)
                .scope(&scope);
        if let Some(audience) = &self.config.audience {
            builder = builder.audience(audience);
        }
        if let Some(last_login) = account.last_login_at {
            builder = builder.auth_time(last_login.unix_timestamp());
        }
        let claims = builder.build();

        let refresh_token = issue_refresh.then(generate_refresh_token);
        let (stored_raw, stored_hash) = match &refresh_token {
            Some(raw) if self.config.hash_refresh_tokens => (None, Some(hash_token(raw))),
            Some(raw) => (Some(raw.clone()), None),
            None => (None, None),
        };

        let record = self
            .tokens
            .create(TokenRecord {
                id: Uuid::new_v4(),
                account_id: account.id,
                application_id: application.id,
                jti: claims.jti.clone(),
                refresh_token: stored_raw,
                refresh_token_hash: stored_hash,
                scope: scope.clone(),
                expires_at: now + self.config.token_lifetime,
                created_at: now,
                revoked_at: None,
            })
            .await?;

        let access_token = self.codec.encode(&claims)?;

        tracing::debug!(
            client_id = %application.client_id,
            jti = %claims.jti,
            "issued access token"
        );

        Ok(IssuedToken {
            access_token,
            token_type: "bearer",
            expires_in: lifetime,
            refresh_token,
            scope,
            claims,
            record,
        })
    }

    /// Resolves the granted scope set.
    fn resolve_scopes(
        &self,
        application: &Application,
        requested: &[String],
    ) -> AuthResult<Vec<String>> {
        if requested.is_empty() {
            return Ok(application.scopes.clone());
        }
        if !application.allows_scopes(requested) {
            return Err(AuthError::invalid_scope(
                "requested scope exceeds the application's allowed set",
            ));
        }
        Ok(requested.to_vec())
    }

    /// Derives the `sub` claim per the effective subject type.
    fn subject_for(&self, account: &Account, application: &Application) -> AuthResult<String> {
        let subject_type = application.subject_type.unwrap_or(self.config.subject_type);
        match subject_type {
            SubjectType::Public => Ok(account.id.to_string()),
            SubjectType::Pairwise => {
                let salt = self.config.pairwise_salt.as_deref().ok_or_else(|| {
                    AuthError::configuration("pairwise subject type requires a pairwise salt")
                })?;
                Ok(pairwise_subject(account.id, application.id, salt))
            }
        }
    }
}

/// Derives a pairwise subject: hex SHA-256 over the account id, the
/// application id, and the server salt.
#[must_use]
pub fn pairwise_subject(account_id: Uuid, application_id: Uuid, salt: &str) -> String {
    hex::encode(Sha256::digest(
        format!("{account_id}{application_id}{salt}").as_bytes(),
    ))
}

/// Generates a high-entropy refresh token.
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 of a token, the stored form when hashing is enabled.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
