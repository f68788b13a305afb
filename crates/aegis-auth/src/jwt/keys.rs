//! Signing key material and JWKS publication.
//!
//! [`SigningKeyPair`] wraps a private/public pair for one algorithm.
//! [`KeyMaterial`] is the process-wide key registry: the current
//! signing key, an optional legacy key kept verifiable during
//! rotation, and an optional per-algorithm table for servers that sign
//! with more than one algorithm. It is immutable after startup.
//!
//! Key ids are RFC 7638 JWK thumbprints, so the same public key always
//! publishes under the same `kid`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::SigningKey as EcSigningKey;
use p384::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::AuthResult;

/// Supported signing algorithms for JWT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256 (widely compatible).
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA with P-384 curve (smaller keys).
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON Web Key Set, as published at the JWKS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Creates a new empty JWKS.
    #[must_use]
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Adds a key to the set.
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }
}

impl Default for Jwks {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID (RFC 7638 thumbprint).
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    // RSA-specific fields
    /// RSA modulus (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // EC-specific fields
    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// A signing key pair for JWT operations.
pub struct SigningKeyPair {
    /// Key ID (RFC 7638 thumbprint of the public key).
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (private key) for signing.
    pub(crate) encoding_key: EncodingKey,

    /// Decoding key (public key) for verification.
    pub(crate) decoding_key: DecodingKey,

    /// Public key data for JWKS export.
    public_key_data: PublicKeyData,

    /// When the key was created.
    pub created_at: OffsetDateTime,
}

// Key material stays out of logs; only the public identifiers print.
impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Internal representation of public key data for JWKS export.
enum PublicKeyData {
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Ec { x: Vec<u8>, y: Vec<u8> },
}

impl PublicKeyData {
    /// Computes the RFC 7638 thumbprint: SHA-256 over the canonical
    /// JSON of the required members, base64url without padding.
    fn thumbprint(&self) -> String {
        let canonical = match self {
            Self::Rsa { n, e } => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                URL_SAFE_NO_PAD.encode(e),
                URL_SAFE_NO_PAD.encode(n)
            ),
            Self::Ec { x, y } => format!(
                r#"{{"crv":"P-384","kty":"EC","x":"{}","y":"{}"}}"#,
                URL_SAFE_NO_PAD.encode(x),
                URL_SAFE_NO_PAD.encode(y)
            ),
        };
        URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
    }
}

impl SigningKeyPair {
    /// Generates a new RSA key pair.
    ///
    /// # Errors
    /// Returns an error if key generation fails or the algorithm is
    /// not RSA-based.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> AuthResult<Self> {
        if !algorithm.is_rsa() {
            return Err(AuthError::configuration(format!(
                "algorithm {algorithm} is not RSA-based"
            )));
        }

        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let public_key_data = PublicKeyData::Rsa { n, e };

        Ok(Self {
            kid: public_key_data.thumbprint(),
            algorithm,
            encoding_key,
            decoding_key,
            public_key_data,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Generates a new EC key pair using the P-384 curve.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_ec() -> AuthResult<Self> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        let signing_key = EcSigningKey::from(&secret_key);
        let public_key = signing_key.verifying_key();

        let point = public_key.to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| AuthError::configuration("missing x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| AuthError::configuration("missing y coordinate"))?;

        // jsonwebtoken requires PKCS8 PEM for EC private keys.
        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let x_b64 = URL_SAFE_NO_PAD.encode(&x[..]);
        let y_b64 = URL_SAFE_NO_PAD.encode(&y[..]);
        let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let public_key_data = PublicKeyData::Ec {
            x: x.to_vec(),
            y: y.to_vec(),
        };

        Ok(Self {
            kid: public_key_data.thumbprint(),
            algorithm: SigningAlgorithm::ES384,
            encoding_key,
            decoding_key,
            public_key_data,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Loads a key pair from PEM strings.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> AuthResult<Self> {
        let (encoding_key, decoding_key, public_key_data) = if algorithm.is_rsa() {
            let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
                .map_err(|e| AuthError::configuration(e.to_string()))?;
            let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
                .map_err(|e| AuthError::configuration(e.to_string()))?;

            let public_key = RsaPublicKey::from_public_key_pem(public_pem)
                .map_err(|e| AuthError::configuration(e.to_string()))?;
            let n = public_key.n().to_bytes_be();
            let e = public_key.e().to_bytes_be();

            (encoding_key, decoding_key, PublicKeyData::Rsa { n, e })
        } else {
            let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
                .map_err(|e| AuthError::configuration(e.to_string()))?;

            // PKCS#8 is the format this crate emits; SEC1 "EC PRIVATE
            // KEY" PEMs are accepted as a fallback.
            let secret_key = EcSecretKey::from_pkcs8_pem(private_pem)
                .or_else(|_| EcSecretKey::from_sec1_pem(private_pem))
                .map_err(|e| AuthError::configuration(e.to_string()))?;
            let signing_key = EcSigningKey::from(&secret_key);
            let point = signing_key.verifying_key().to_encoded_point(false);
            let x = point
                .x()
                .ok_or_else(|| AuthError::configuration("missing x coordinate"))?;
            let y = point
                .y()
                .ok_or_else(|| AuthError::configuration("missing y coordinate"))?;

            let x_b64 = URL_SAFE_NO_PAD.encode(&x[..]);
            let y_b64 = URL_SAFE_NO_PAD.encode(&y[..]);
            let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
                .map_err(|e| AuthError::configuration(e.to_string()))?;

            (
                encoding_key,
                decoding_key,
                PublicKeyData::Ec {
                    x: x.to_vec(),
                    y: y.to_vec(),
                },
            )
        };

        Ok(Self {
            kid: public_key_data.thumbprint(),
            algorithm,
            encoding_key,
            decoding_key,
            public_key_data,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        match &self.public_key_data {
            PublicKeyData::Rsa { n, e } => Jwk {
                kty: "RSA".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: Some(URL_SAFE_NO_PAD.encode(n)),
                e: Some(URL_SAFE_NO_PAD.encode(e)),
                crv: None,
                x: None,
                y: None,
            },
            PublicKeyData::Ec { x, y } => Jwk {
                kty: "EC".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: None,
                e: None,
                crv: Some("P-384".to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            },
        }
    }
}

/// Process-wide signing key registry.
///
/// Built once at startup; rotation means restarting with the previous
/// key demoted to the legacy slot.
pub struct KeyMaterial {
    current: Arc<SigningKeyPair>,
    legacy: Option<Arc<SigningKeyPair>>,
    by_algorithm: HashMap<SigningAlgorithm, Arc<SigningKeyPair>>,
}

impl KeyMaterial {
    /// Creates key material with a single current signing key.
    #[must_use]
    pub fn new(current: SigningKeyPair) -> Self {
        Self {
            current: Arc::new(current),
            legacy: None,
            by_algorithm: HashMap::new(),
        }
    }

    /// Keeps the previous signing key verifiable during rotation.
    #[must_use]
    pub fn with_legacy(mut self, legacy: SigningKeyPair) -> Self {
        self.legacy = Some(Arc::new(legacy));
        self
    }

    /// Registers a dedicated key for one algorithm.
    #[must_use]
    pub fn with_algorithm_key(mut self, pair: SigningKeyPair) -> Self {
        self.by_algorithm.insert(pair.algorithm, Arc::new(pair));
        self
    }

    /// Returns the current signing key.
    #[must_use]
    pub fn current(&self) -> &Arc<SigningKeyPair> {
        &self.current
    }

    /// Returns the signing key for `algorithm`, preferring the
    /// per-algorithm table and falling back to the current key.
    #[must_use]
    pub fn signing_key_for(&self, algorithm: SigningAlgorithm) -> &Arc<SigningKeyPair> {
        self.by_algorithm.get(&algorithm).unwrap_or(&self.current)
    }

    /// Returns `true` if a legacy key is still verifiable.
    #[must_use]
    pub fn rotation_active(&self) -> bool {
        self.legacy.is_some()
    }

    /// Returns all keys a token may verify against, current first.
    #[must_use]
    pub fn verification_keys(&self) -> Vec<&Arc<SigningKeyPair>> {
        let mut keys = vec![&self.current];
        if let Some(legacy) = &self.legacy {
            keys.push(legacy);
        }
        for pair in self.by_algorithm.values() {
            if pair.kid != self.current.kid {
                keys.push(pair);
            }
        }
        keys
    }

    /// Returns the published key set: the current key, the legacy key
    /// while rotation is active, and any per-algorithm keys.
    ///
    /// Symmetric encryption keys are never published.
    #[must_use]
    pub fn published_jwks(&self) -> Jwks {
        let mut jwks = Jwks::new();
        for pair in self.verification_keys() {
            jwks.add_key(pair.to_jwk());
        }
        jwks
    }

    /// Returns the distinct signing algorithms this material covers.
    #[must_use]
    pub fn algorithms(&self) -> Vec<SigningAlgorithm> {
        let mut algs = vec![self.current.algorithm];
        for alg in self.by_algorithm.keys() {
            if !algs.contains(alg) {
                algs.push(*alg);
            }
        }
        algs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_rsa_key_pair() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        assert_eq!(key_pair.algorithm, SigningAlgorithm::RS256);
        assert!(!key_pair.kid.is_empty());
    }

    #[test]
    fn test_generate_rsa_rejects_ec_algorithm() {
        let err = SigningKeyPair::generate_rsa(SigningAlgorithm::ES384).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_generate_ec_key_pair() {
        let key_pair = SigningKeyPair::generate_ec().unwrap();
        assert_eq!(key_pair.algorithm, SigningAlgorithm::ES384);
        assert!(!key_pair.kid.is_empty());
    }

    #[test]
    fn test_kid_is_stable_thumbprint() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        // Thumbprints are 32 bytes base64url without padding.
        assert_eq!(key_pair.kid.len(), 43);
        assert!(!key_pair.kid.contains('='));
        assert_eq!(key_pair.kid, key_pair.to_jwk().kid);

        let other = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        assert_ne!(key_pair.kid, other.kid);
    }

    #[test]
    fn test_jwk_export_rsa() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS384).unwrap();
        let jwk = key_pair.to_jwk();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.use_, "sig");
        assert_eq!(jwk.alg, "RS384");
        assert!(jwk.n.is_some());
        assert!(jwk.e.is_some());
        assert!(jwk.crv.is_none());
    }

    #[test]
    fn test_jwk_export_ec() {
        let key_pair = SigningKeyPair::generate_ec().unwrap();
        let jwk = key_pair.to_jwk();

        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.alg, "ES384");
        assert_eq!(jwk.crv, Some("P-384".to_string()));
        assert!(jwk.x.is_some());
        assert!(jwk.y.is_some());
        assert!(jwk.n.is_none());
    }

    #[test]
    fn test_published_jwks_includes_legacy() {
        let current = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let legacy = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let legacy_kid = legacy.kid.clone();

        let material = KeyMaterial::new(current).with_legacy(legacy);
        assert!(material.rotation_active());

        let jwks = material.published_jwks();
        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[1].kid, legacy_kid);
    }

    #[test]
    fn test_algorithm_table_lookup() {
        let current = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let current_kid = current.kid.clone();
        let ec = SigningKeyPair::generate_ec().unwrap();
        let ec_kid = ec.kid.clone();

        let material = KeyMaterial::new(current).with_algorithm_key(ec);

        assert_eq!(
            material.signing_key_for(SigningAlgorithm::ES384).kid,
            ec_kid
        );
        // No table entry: falls back to the current key.
        assert_eq!(
            material.signing_key_for(SigningAlgorithm::RS384).kid,
            current_kid
        );

        let mut algs = material.algorithms();
        algs.sort_by_key(|a| a.as_str());
        assert_eq!(algs, vec![SigningAlgorithm::ES384, SigningAlgorithm::RS256]);
    }

    #[test]
    fn test_from_pem_round_trip() {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let private_pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        let key_pair =
            SigningKeyPair::from_pem(SigningAlgorithm::RS256, &private_pem, &public_pem).unwrap();
        assert_eq!(key_pair.algorithm, SigningAlgorithm::RS256);

        // Loading the same key again yields the same thumbprint.
        let again =
            SigningKeyPair::from_pem(SigningAlgorithm::RS256, &private_pem, &public_pem).unwrap();
        assert_eq!(key_pair.kid, again.kid);
    }

    #[test]
    fn test_from_pem_round_trip_ec() {
        let secret_key = EcSecretKey::random(&mut OsRng);
        let private_pem = secret_key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let public_pem = secret_key
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        // PKCS#8, the format generate_ec emits.
        let key_pair =
            SigningKeyPair::from_pem(SigningAlgorithm::ES384, &private_pem, &public_pem).unwrap();
        assert_eq!(key_pair.algorithm, SigningAlgorithm::ES384);

        let again =
            SigningKeyPair::from_pem(SigningAlgorithm::ES384, &private_pem, &public_pem).unwrap();
        assert_eq!(key_pair.kid, again.kid);
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let debug = format!("{key_pair:?}");

        assert!(debug.contains(&key_pair.kid));
        assert!(debug.contains("RS256"));
        assert!(!debug.contains("encoding_key"));
        assert!(!debug.contains("public_key_data"));
    }
}
