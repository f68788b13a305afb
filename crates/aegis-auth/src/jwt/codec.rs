//! Encoding and verification of access tokens.
//!
//! [`JwtCodec`] is the single place tokens are signed and verified.
//! Encoding assigns the deterministic `jti`, signs with the key
//! resolved from the configured algorithm, and wraps the result in a
//! JWE when encryption is configured. Decoding resolves verification
//! keys by server role, verifies the signature, and then enforces each
//! requested claim check independently; any failure yields `None`,
//! never an error the caller could confuse with a server fault.

use std::borrow::Cow;
use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header, encode};
use serde_json::Value;
use time::OffsetDateTime;

use crate::config::{AuthConfig, ServerRole};
use crate::error::AuthError;
use crate::jwks::RemoteJwksClient;
use crate::jwt::claims::{AccessTokenClaims, generate_jti};
use crate::jwt::jwe;
use crate::jwt::keys::KeyMaterial;
use crate::AuthResult;

/// Per-call verification policy.
///
/// Each flag is enforced independently when set; a token must satisfy
/// every requested check.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Require a future `exp` claim (default: true).
    pub verify_exp: bool,
    /// Reject tokens whose `nbf` lies in the future (default: true).
    pub verify_nbf: bool,
    /// Reject tokens issued in the future (default: true).
    pub verify_iat: bool,
    /// Require `iss` to equal the expected issuer (default: true).
    pub verify_iss: bool,
    /// Require `aud` to contain the expected audience (default: false).
    pub verify_aud: bool,
    /// Require `jti` to match its derived value (default: false).
    pub verify_jti: bool,
    /// Issuer to check against instead of the configured one.
    pub expected_issuer: Option<String>,
    /// Audience required when `verify_aud` is set.
    pub expected_audience: Option<String>,
    /// Verification keys supplied by the caller, e.g. an application's
    /// registered JWKS.
    pub caller_jwks: Option<Arc<JwkSet>>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_exp: true,
            verify_nbf: true,
            verify_iat: true,
            verify_iss: true,
            verify_aud: false,
            verify_jti: false,
            expected_issuer: None,
            expected_audience: None,
            caller_jwks: None,
        }
    }
}

impl DecodeOptions {
    /// Creates options with the default checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Controls the `exp` check.
    #[must_use]
    pub fn with_verify_exp(mut self, verify: bool) -> Self {
        self.verify_exp = verify;
        self
    }

    /// Controls the `nbf` check.
    #[must_use]
    pub fn with_verify_nbf(mut self, verify: bool) -> Self {
        self.verify_nbf = verify;
        self
    }

    /// Controls the `iat` check.
    #[must_use]
    pub fn with_verify_iat(mut self, verify: bool) -> Self {
        self.verify_iat = verify;
        self
    }

    /// Controls the `iss` check.
    #[must_use]
    pub fn with_verify_iss(mut self, verify: bool) -> Self {
        self.verify_iss = verify;
        self
    }

    /// Requires the audience claim to contain `audience`.
    #[must_use]
    pub fn with_expected_audience(mut self, audience: impl Into<String>) -> Self {
        self.verify_aud = true;
        self.expected_audience = Some(audience.into());
        self
    }

    /// Checks `iss` against `issuer` instead of the configured value.
    #[must_use]
    pub fn with_expected_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Controls the derived `jti` check.
    #[must_use]
    pub fn with_verify_jti(mut self, verify: bool) -> Self {
        self.verify_jti = verify;
        self
    }

    /// Supplies caller verification keys.
    #[must_use]
    pub fn with_caller_jwks(mut self, jwks: Arc<JwkSet>) -> Self {
        self.caller_jwks = Some(jwks);
        self
    }
}

/// One verification key candidate.
struct Candidate {
    kid: Option<String>,
    algorithm: Algorithm,
    key: DecodingKey,
}

/// Signs and verifies access tokens.
pub struct JwtCodec {
    config: Arc<AuthConfig>,
    keys: Arc<KeyMaterial>,
    jwks_client: Arc<RemoteJwksClient>,
}

impl JwtCodec {
    /// Creates a new codec.
    #[must_use]
    pub fn new(
        config: Arc<AuthConfig>,
        keys: Arc<KeyMaterial>,
        jwks_client: Arc<RemoteJwksClient>,
    ) -> Self {
        Self {
            config,
            keys,
            jwks_client,
        }
    }

    /// Returns the key material backing this codec.
    #[must_use]
    pub fn keys(&self) -> &Arc<KeyMaterial> {
        &self.keys
    }

    /// Returns the configuration backing this codec.
    #[must_use]
    pub fn config(&self) -> &Arc<AuthConfig> {
        &self.config
    }

    /// Signs `claims` into a compact token.
    ///
    /// The `jti` is overwritten with its derived value before signing
    /// so the claim can never disagree with `aud`/`iat`. When
    /// encryption is configured the signed token is wrapped as JWE
    /// plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when no usable signing key
    /// or encryption settings exist.
    pub fn encode(&self, claims: &AccessTokenClaims) -> AuthResult<String> {
        let mut claims = claims.clone();
        claims.jti = generate_jti(&claims.aud, claims.iat);

        let pair = self.keys.signing_key_for(self.config.signing_algorithm);
        let mut header = Header::new(pair.algorithm.to_jwt_algorithm());
        header.kid = Some(pair.kid.clone());

        let jws = encode(&header, &claims, &pair.encoding_key)
            .map_err(|e| AuthError::configuration(format!("token signing failed: {e}")))?;

        match &self.config.encryption {
            Some(encryption) => {
                encryption.validate()?;
                jwe::encrypt(&jws, &encryption.key)
            }
            None => Ok(jws),
        }
    }

    /// Verifies a token and returns its access token claims.
    ///
    /// Returns `None` for any structural, cryptographic, or claim
    /// failure.
    pub async fn decode(&self, token: &str, options: &DecodeOptions) -> Option<AccessTokenClaims> {
        let value = self.decode_value(token, options).await?;
        serde_json::from_value(value).ok()
    }

    /// Verifies a token and returns its raw claim set.
    ///
    /// This is the generic entry point used for assertions and signed
    /// request objects whose claim shapes differ from access tokens.
    pub async fn decode_value(&self, token: &str, options: &DecodeOptions) -> Option<Value> {
        let token = self.unwrap_encryption(token)?;
        let token = token.as_ref();
        let header = decode_header(token).ok()?;

        let mut candidates = self.verification_candidates(&header, options).await?;
        if let Some(kid) = &header.kid {
            // Try the kid match first, then the rest in order.
            candidates.sort_by_key(|c| c.kid.as_deref() != Some(kid.as_str()));
        }

        for candidate in &candidates {
            if candidate.algorithm != header.alg {
                continue;
            }
            let mut validation = Validation::new(candidate.algorithm);
            validation.validate_exp = false;
            validation.validate_nbf = false;
            validation.validate_aud = false;
            validation.set_required_spec_claims(&[] as &[&str]);

            if let Ok(data) = decode::<Value>(token, &candidate.key, &validation) {
                if self.check_claims(&data.claims, options) {
                    return Some(data.claims);
                }
                tracing::debug!("token signature verified but claim checks failed");
                return None;
            }
        }

        tracing::debug!("no verification key accepted the token signature");
        None
    }

    /// Removes the encryption layer when one is configured.
    ///
    /// Tokens that are plain JWS pass through untouched, since caller
    /// assertions are never encrypted.
    fn unwrap_encryption<'a>(&self, token: &'a str) -> Option<Cow<'a, str>> {
        match &self.config.encryption {
            Some(encryption) if jwe::looks_like_jwe(token) => {
                jwe::decrypt(token, &encryption.key).map(Cow::Owned)
            }
            Some(_) | None => Some(Cow::Borrowed(token)),
        }
    }

    /// Resolves the verification keys for this decode.
    ///
    /// The authorization server verifies against its own keys whenever
    /// rotation is active, then against caller-supplied JWKS, then its
    /// single key. The resource server always fetches the
    /// authorization server's published key set.
    async fn verification_candidates(
        &self,
        header: &Header,
        options: &DecodeOptions,
    ) -> Option<Vec<Candidate>> {
        match self.config.role {
            ServerRole::ResourceServer => {
                let uri = self.config.auth_server_jwks_uri.as_ref()?;
                match self.jwks_client.get(uri).await {
                    Ok(jwks) => Some(jwk_set_candidates(&jwks, header)),
                    Err(e) => {
                        tracing::warn!("failed to fetch verification keys: {}", e);
                        None
                    }
                }
            }
            ServerRole::AuthorizationServer => {
                if !self.keys.rotation_active()
                    && let Some(jwks) = &options.caller_jwks
                {
                    return Some(jwk_set_candidates(jwks, header));
                }
                Some(
                    self.keys
                        .verification_keys()
                        .into_iter()
                        .map(|pair| Candidate {
                            kid: Some(pair.kid.clone()),
                            algorithm: pair.algorithm.to_jwt_algorithm(),
                            key: pair.decoding_key.clone(),
                        })
                        .collect(),
                )
            }
        }
    }

    /// Enforces the requested claim checks, each independently.
    fn check_claims(&self, claims: &Value, options: &DecodeOptions) -> bool {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        if options.verify_exp {
            match claims.get("exp").and_then(Value::as_i64) {
                Some(exp) if exp > now => {}
                _ => return false,
            }
        }

        if options.verify_nbf
            && let Some(nbf) = claims.get("nbf")
        {
            match nbf.as_i64() {
                Some(nbf) if nbf <= now => {}
                _ => return false,
            }
        }

        if options.verify_iat
            && let Some(iat) = claims.get("iat")
        {
            match iat.as_i64() {
                Some(iat) if iat <= now => {}
                _ => return false,
            }
        }

        if options.verify_iss {
            let expected = options
                .expected_issuer
                .as_deref()
                .unwrap_or(&self.config.issuer);
            if claims.get("iss").and_then(Value::as_str) != Some(expected) {
                return false;
            }
        }

        if options.verify_aud {
            let Some(expected) = options.expected_audience.as_deref() else {
                return false;
            };
            if !audience_contains(claims.get("aud"), expected) {
                return false;
            }
        }

        if options.verify_jti {
            let aud = claims.get("aud").and_then(Value::as_str);
            let iat = claims.get("iat").and_then(Value::as_i64);
            let jti = claims.get("jti").and_then(Value::as_str);
            match (aud, iat, jti) {
                (Some(aud), Some(iat), Some(jti)) if jti == generate_jti(aud, iat) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Checks whether an `aud` claim (string or array) contains `expected`.
fn audience_contains(aud: Option<&Value>, expected: &str) -> bool {
    match aud {
        Some(Value::String(s)) => s == expected,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str() == Some(expected)),
        _ => false,
    }
}

/// Converts a JWK set into verification candidates.
///
/// Keys without a usable algorithm fall back to the token header's
/// algorithm; keys that cannot convert are skipped.
fn jwk_set_candidates(jwks: &JwkSet, header: &Header) -> Vec<Candidate> {
    jwks.keys
        .iter()
        .filter_map(|jwk| {
            let key = DecodingKey::from_jwk(jwk).ok()?;
            let algorithm = jwk_algorithm(jwk).unwrap_or(header.alg);
            Some(Candidate {
                kid: jwk.common.key_id.clone(),
                algorithm,
                key,
            })
        })
        .collect()
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &jsonwebtoken::jwk::Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        jsonwebtoken::jwk::KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        jsonwebtoken::jwk::KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        jsonwebtoken::jwk::KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        jsonwebtoken::jwk::KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        jsonwebtoken::jwk::KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        jsonwebtoken::jwk::KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        jsonwebtoken::jwk::KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        jsonwebtoken::jwk::KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        jsonwebtoken::jwk::KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}
