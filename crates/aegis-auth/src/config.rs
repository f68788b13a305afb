//! Authorization server configuration.
//!
//! [`AuthConfig`] carries the token policy: issuer identity, audience,
//! lifetimes, subject derivation, and encryption settings. It is built
//! once at startup and shared immutably.

use std::str::FromStr;
use std::sync::Arc;

use time::Duration;
use url::Url;

use crate::error::AuthError;
use crate::jwt::SigningAlgorithm;

/// Which side of the token exchange this process plays.
///
/// The role decides where verification keys come from: an
/// authorization server verifies against its own key material, a
/// resource server fetches the authorization server's published JWKS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    /// This process mints tokens and holds the signing keys.
    AuthorizationServer,
    /// This process only verifies tokens minted elsewhere.
    ResourceServer,
}

/// Subject claim derivation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectType {
    /// `sub` is the account identifier.
    Public,
    /// `sub` is a per-client hash of the account identifier, so two
    /// clients cannot correlate the same end user.
    Pairwise,
}

impl FromStr for SubjectType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "pairwise" => Ok(Self::Pairwise),
            other => Err(AuthError::configuration(format!(
                "unknown subject type: {other}"
            ))),
        }
    }
}

impl SubjectType {
    /// Returns the metadata string for this subject type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Pairwise => "pairwise",
        }
    }
}

/// Token encryption (JWE) settings.
///
/// Only direct symmetric encryption with AES-256-GCM is supported.
/// Any other `alg`/`enc` combination is rejected at construction so a
/// misconfigured server fails at startup instead of minting tokens it
/// cannot read back.
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    /// JWE key management algorithm. Must be `dir`.
    pub algorithm: String,
    /// JWE content encryption algorithm. Must be `A256GCM`.
    pub encryption: String,
    /// 256-bit content encryption key.
    pub key: Arc<[u8; 32]>,
}

impl EncryptionConfig {
    /// Creates a direct-encryption config with the given 256-bit key.
    #[must_use]
    pub fn direct(key: [u8; 32]) -> Self {
        Self {
            algorithm: "dir".to_string(),
            encryption: "A256GCM".to_string(),
            key: Arc::new(key),
        }
    }

    /// Validates the algorithm pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] for any combination other
    /// than `dir` + `A256GCM`.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.algorithm != "dir" {
            return Err(AuthError::configuration(format!(
                "unsupported JWE algorithm: {}",
                self.algorithm
            )));
        }
        if self.encryption != "A256GCM" {
            return Err(AuthError::configuration(format!(
                "unsupported JWE encryption: {}",
                self.encryption
            )));
        }
        Ok(())
    }
}

/// Authorization server token policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Role of this process.
    pub role: ServerRole,

    /// Value of the `iss` claim and metadata `issuer` field.
    pub issuer: String,

    /// Explicit `aud` for minted tokens. When `None`, the audience is
    /// the requesting client's id.
    pub audience: Option<String>,

    /// Access token lifetime (default: 1 hour).
    pub token_lifetime: Duration,

    /// Refresh token lifetime (default: 30 days).
    pub refresh_token_lifetime: Duration,

    /// Subject derivation strategy (default: public).
    pub subject_type: SubjectType,

    /// Salt for pairwise subject derivation. Required when
    /// `subject_type` is pairwise.
    pub pairwise_salt: Option<String>,

    /// Signing algorithm for minted tokens (default: RS256).
    pub signing_algorithm: SigningAlgorithm,

    /// Optional token encryption layer.
    pub encryption: Option<EncryptionConfig>,

    /// Store refresh tokens hashed instead of raw (default: true).
    pub hash_refresh_tokens: bool,

    /// The authorization server's JWKS endpoint, used in the resource
    /// server role to fetch verification keys.
    pub auth_server_jwks_uri: Option<Url>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            role: ServerRole::AuthorizationServer,
            issuer: "https://auth.localhost".to_string(),
            audience: None,
            token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::days(30),
            subject_type: SubjectType::Public,
            pairwise_salt: None,
            signing_algorithm: SigningAlgorithm::RS256,
            encryption: None,
            hash_refresh_tokens: true,
            auth_server_jwks_uri: None,
        }
    }
}

impl AuthConfig {
    /// Creates a configuration with default values and the given issuer.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Sets the server role.
    #[must_use]
    pub fn with_role(mut self, role: ServerRole) -> Self {
        self.role = role;
        self
    }

    /// Sets a fixed audience for minted tokens.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets the subject derivation strategy.
    #[must_use]
    pub fn with_subject_type(mut self, subject_type: SubjectType) -> Self {
        self.subject_type = subject_type;
        self
    }

    /// Sets the pairwise subject salt.
    #[must_use]
    pub fn with_pairwise_salt(mut self, salt: impl Into<String>) -> Self {
        self.pairwise_salt = Some(salt.into());
        self
    }

    /// Sets the signing algorithm.
    #[must_use]
    pub fn with_signing_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = algorithm;
        self
    }

    /// Enables token encryption.
    #[must_use]
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Controls whether refresh tokens are stored hashed.
    #[must_use]
    pub fn with_hash_refresh_tokens(mut self, hash: bool) -> Self {
        self.hash_refresh_tokens = hash;
        self
    }

    /// Sets the upstream JWKS endpoint for the resource server role.
    #[must_use]
    pub fn with_auth_server_jwks_uri(mut self, uri: Url) -> Self {
        self.auth_server_jwks_uri = Some(uri);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the pairwise salt is
    /// missing for pairwise subjects, the encryption settings are
    /// unsupported, or the resource server role lacks a JWKS endpoint.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.subject_type == SubjectType::Pairwise && self.pairwise_salt.is_none() {
            return Err(AuthError::configuration(
                "pairwise subject type requires a pairwise salt",
            ));
        }
        if let Some(encryption) = &self.encryption {
            encryption.validate()?;
        }
        if self.role == ServerRole::ResourceServer && self.auth_server_jwks_uri.is_none() {
            return Err(AuthError::configuration(
                "resource server role requires auth_server_jwks_uri",
            ));
        }
        Ok(())
    }
}
