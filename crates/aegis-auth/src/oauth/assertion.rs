//! Assertion grant authentication.
//!
//! Two families of assertion flow through the token endpoint:
//!
//! - **Authorization grants**: `grant_type` is an
//!   `urn:ietf:params:oauth:grant-type:` URN and the `assertion`
//!   parameter proves a principal authorized the request.
//! - **Client authentication**: `client_assertion_type` is an
//!   `urn:ietf:params:oauth:client-assertion-type:` URN and the
//!   `client_assertion` parameter proves the client's identity.
//!
//! Handlers are registered by normalized URN suffix at startup; an
//! unregistered suffix fails as `invalid_grant` rather than being
//! resolved dynamically.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::jwk::JwkSet;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::jwks::RemoteJwksClient;
use crate::jwt::{DecodeOptions, JwtCodec};
use crate::oauth::request::TokenRequest;
use crate::storage::{AccountStorage, ApplicationStorage, JtiStorage};
use crate::token::{IssuedToken, TokenIssuer};
use crate::types::{Account, Application};
use crate::AuthResult;

/// Prefix of assertion authorization grant URNs.
pub const GRANT_TYPE_PREFIX: &str = "urn:ietf:params:oauth:grant-type:";

/// Prefix of client assertion type URNs.
pub const CLIENT_ASSERTION_TYPE_PREFIX: &str = "urn:ietf:params:oauth:client-assertion-type:";

/// Returns the normalized handler name for an assertion grant type,
/// or `None` when the value is not an assertion URN.
///
/// The URN suffix names the handler with hyphens folded to
/// underscores, so `...grant-type:saml2-bearer` selects the
/// `saml2_bearer` handler.
#[must_use]
pub fn assertion_grant_type(grant_type: &str) -> Option<String> {
    grant_type
        .strip_prefix(GRANT_TYPE_PREFIX)
        .map(|suffix| suffix.replace('-', "_"))
}

/// Returns the normalized handler name for a client assertion type,
/// or `None` when the value is not a client assertion URN.
#[must_use]
pub fn client_assertion_type(assertion_type: &str) -> Option<String> {
    assertion_type
        .strip_prefix(CLIENT_ASSERTION_TYPE_PREFIX)
        .map(|suffix| suffix.replace('-', "_"))
}

/// The parties an authorization assertion speaks for.
#[derive(Debug, Clone)]
pub struct AssertionPrincipal {
    /// The application the assertion was issued by.
    pub application: Application,

    /// The account the assertion subject maps to, when it maps to one.
    pub account: Option<Account>,
}

/// Verifies authorization grant assertions.
#[async_trait]
pub trait AssertionGrantHandler: Send + Sync {
    /// Verifies `assertion` and resolves the principal it speaks for.
    async fn resolve(&self, assertion: &str) -> AuthResult<AssertionPrincipal>;
}

/// Verifies client authentication assertions.
#[async_trait]
pub trait ClientAssertionHandler: Send + Sync {
    /// Verifies `assertion` and resolves the authenticated application.
    async fn authenticate(&self, assertion: &str) -> AuthResult<Application>;
}

/// Typed handler registry, populated once at startup.
#[derive(Default)]
pub struct AssertionRegistry {
    grants: HashMap<String, Arc<dyn AssertionGrantHandler>>,
    clients: HashMap<String, Arc<dyn ClientAssertionHandler>>,
}

impl AssertionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authorization grant handler under its normalized
    /// URN suffix.
    #[must_use]
    pub fn with_grant_handler(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn AssertionGrantHandler>,
    ) -> Self {
        self.grants.insert(name.into(), handler);
        self
    }

    /// Registers a client assertion handler under its normalized URN
    /// suffix.
    #[must_use]
    pub fn with_client_handler(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn ClientAssertionHandler>,
    ) -> Self {
        self.clients.insert(name.into(), handler);
        self
    }

    /// Looks up an authorization grant handler.
    #[must_use]
    pub fn grant_handler(&self, name: &str) -> Option<&Arc<dyn AssertionGrantHandler>> {
        self.grants.get(name)
    }

    /// Looks up a client assertion handler.
    #[must_use]
    pub fn client_handler(&self, name: &str) -> Option<&Arc<dyn ClientAssertionHandler>> {
        self.clients.get(name)
    }

    /// Returns the registered grant type URNs for metadata.
    #[must_use]
    pub fn grant_type_urns(&self) -> Vec<String> {
        self.grants
            .keys()
            .map(|name| format!("{GRANT_TYPE_PREFIX}{}", name.replace('_', "-")))
            .collect()
    }
}

/// Token-endpoint engine for assertion grants and client assertions.
pub struct AssertionEngine {
    registry: AssertionRegistry,
    issuer: Arc<TokenIssuer>,
}

impl AssertionEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(registry: AssertionRegistry, issuer: Arc<TokenIssuer>) -> Self {
        Self { registry, issuer }
    }

    /// Returns the handler registry.
    #[must_use]
    pub fn registry(&self) -> &AssertionRegistry {
        &self.registry
    }

    /// Authenticates the client from its assertion, when one is sent.
    ///
    /// An accompanying `client_id` parameter must agree with the
    /// application the assertion authenticates.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` for unknown assertion types, a missing
    /// `client_assertion` parameter, a failed verification, or a
    /// `client_id` mismatch.
    pub async fn authenticate_client(
        &self,
        request: &TokenRequest,
    ) -> AuthResult<Option<Application>> {
        let Some(assertion_type) = request.client_assertion_type.as_deref() else {
            return Ok(None);
        };

        let name = client_assertion_type(assertion_type).ok_or_else(|| {
            AuthError::invalid_grant(format!("unknown client assertion type: {assertion_type}"))
        })?;
        let handler = self
            .registry
            .client_handler(&name)
            .ok_or_else(|| AuthError::invalid_grant(format!("no {name} client assertion handler")))?;
        let assertion = request
            .client_assertion
            .as_deref()
            .ok_or_else(|| AuthError::invalid_grant("missing client_assertion parameter"))?;

        let application = handler.authenticate(assertion).await?;

        if let Some(client_id) = request.client_id.as_deref()
            && client_id != application.client_id
        {
            tracing::debug!(client_id, "client_id disagrees with client assertion");
            return Err(AuthError::invalid_grant(
                "client_id does not match the client assertion",
            ));
        }

        Ok(Some(application))
    }

    /// Handles a token request whose grant type is an assertion URN.
    ///
    /// Assertion grants never issue refresh tokens.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` for non-assertion grant types
    /// and `invalid_grant` for unregistered suffixes, a missing
    /// `assertion` parameter, failed verification, or an assertion
    /// that identifies no account.
    pub async fn handle_token_request(&self, request: &TokenRequest) -> AuthResult<IssuedToken> {
        let name = assertion_grant_type(&request.grant_type)
            .ok_or_else(|| AuthError::unsupported_grant_type(&request.grant_type))?;
        let handler = self
            .registry
            .grant_handler(&name)
            .ok_or_else(|| AuthError::invalid_grant(format!("no {name} assertion handler")))?;
        let assertion = request
            .assertion
            .as_deref()
            .ok_or_else(|| AuthError::invalid_grant("missing assertion parameter"))?;

        let principal = handler.resolve(assertion).await?;
        let account = principal
            .account
            .ok_or_else(|| AuthError::invalid_grant("assertion does not identify an account"))?;

        self.issuer
            .issue(&account, &principal.application, &request.scopes(), false)
            .await
    }
}

/// JWT bearer assertions (RFC 7523), for both grant and client
/// authentication roles.
///
/// The unverified `iss` claim selects the application, whose
/// registered JWKS then verifies the signature. The subject maps to an
/// account by idempotent insert keyed on login.
pub struct JwtBearerHandler {
    codec: Arc<JwtCodec>,
    applications: Arc<dyn ApplicationStorage>,
    accounts: Arc<dyn AccountStorage>,
    jwks_client: Arc<RemoteJwksClient>,
    jti_storage: Option<Arc<dyn JtiStorage>>,
}

impl JwtBearerHandler {
    /// Registry name for both handler roles.
    pub const NAME: &'static str = "jwt_bearer";

    /// Creates a new handler.
    #[must_use]
    pub fn new(
        codec: Arc<JwtCodec>,
        applications: Arc<dyn ApplicationStorage>,
        accounts: Arc<dyn AccountStorage>,
        jwks_client: Arc<RemoteJwksClient>,
    ) -> Self {
        Self {
            codec,
            applications,
            accounts,
            jwks_client,
            jti_storage: None,
        }
    }

    /// Enables one-time `jti` tracking for replay prevention.
    #[must_use]
    pub fn with_jti_storage(mut self, storage: Arc<dyn JtiStorage>) -> Self {
        self.jti_storage = Some(storage);
        self
    }

    /// Verifies the assertion and returns the issuing application
    /// with the verified claims.
    async fn verify(&self, assertion: &str) -> AuthResult<(Application, Value)> {
        let issuer = peek_claim(assertion, "iss")
            .ok_or_else(|| AuthError::invalid_grant("assertion has no issuer"))?;

        let application = self
            .applications
            .find_by_client_id(&issuer)
            .await?
            .ok_or_else(|| {
                tracing::debug!(issuer = %issuer, "assertion issuer is not a registered client");
                AuthError::invalid_grant("unknown assertion issuer")
            })?;

        let jwks = application_jwk_set(&application, &self.jwks_client).await?;

        // The assertion audience must be this server; its issuer is
        // the client, so the configured issuer check is replaced.
        let options = DecodeOptions::new()
            .with_verify_iss(false)
            .with_expected_audience(&self.codec.config().issuer)
            .with_caller_jwks(jwks);
        let claims = self
            .codec
            .decode_value(assertion, &options)
            .await
            .ok_or_else(|| AuthError::invalid_grant("assertion verification failed"))?;

        if let Some(jti_storage) = &self.jti_storage
            && let Some(jti) = claims.get("jti").and_then(Value::as_str)
        {
            let expires_at = claims
                .get("exp")
                .and_then(Value::as_i64)
                .and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
                .unwrap_or_else(|| OffsetDateTime::now_utc() + time::Duration::minutes(5));
            if !jti_storage.mark_used(jti, expires_at).await? {
                return Err(AuthError::invalid_grant("assertion has already been used"));
            }
        }

        Ok((application, claims))
    }
}

#[async_trait]
impl AssertionGrantHandler for JwtBearerHandler {
    async fn resolve(&self, assertion: &str) -> AuthResult<AssertionPrincipal> {
        let (application, claims) = self.verify(assertion).await?;

        let account = match claims.get("sub").and_then(Value::as_str) {
            Some(subject) => Some(self.accounts.find_or_create_by_login(subject).await?),
            None => None,
        };

        Ok(AssertionPrincipal {
            application,
            account,
        })
    }
}

#[async_trait]
impl ClientAssertionHandler for JwtBearerHandler {
    async fn authenticate(&self, assertion: &str) -> AuthResult<Application> {
        let (application, claims) = self.verify(assertion).await?;

        // A client assertion speaks for the client itself.
        if claims.get("sub").and_then(Value::as_str) != Some(application.client_id.as_str()) {
            return Err(AuthError::invalid_grant(
                "client assertion subject does not match its issuer",
            ));
        }

        Ok(application)
    }
}

/// Resolves the verification key set registered for an application:
/// the inline JWKS document if present, otherwise a fetch from its
/// `jwks_uri`.
pub async fn application_jwk_set(
    application: &Application,
    jwks_client: &RemoteJwksClient,
) -> AuthResult<Arc<JwkSet>> {
    if let Some(document) = &application.jwks {
        let jwks: JwkSet = serde_json::from_value(document.clone())
            .map_err(|e| AuthError::invalid_grant(format!("malformed registered JWKS: {e}")))?;
        return Ok(Arc::new(jwks));
    }
    if let Some(uri) = &application.jwks_uri {
        return jwks_client.get(uri).await;
    }
    Err(AuthError::invalid_grant(
        "application has no registered verification keys",
    ))
}

/// Reads a string claim from an unverified token payload.
fn peek_claim(token: &str, claim: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    value.get(claim)?.as_str().map(str::to_string)
}
