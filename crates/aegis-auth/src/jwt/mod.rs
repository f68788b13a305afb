//! JSON Web Token support.
//!
//! This module owns the key material, claim types, and the codec that
//! turns claims into signed (and optionally encrypted) tokens and
//! back.
//!
//! ## Supported Algorithms
//!
//! - **RS256**: RSA with SHA-256 (widely compatible)
//! - **RS384**: RSA with SHA-384
//! - **ES384**: ECDSA with P-384 curve (smaller keys)
//!
//! Token encryption uses direct AES-256-GCM (`alg=dir`, `enc=A256GCM`).

pub mod claims;
pub mod codec;
pub mod jwe;
pub mod keys;

pub use claims::{AccessTokenClaims, AccessTokenClaimsBuilder, generate_jti};
pub use codec::{DecodeOptions, JwtCodec};
pub use keys::{Jwk, Jwks, KeyMaterial, SigningAlgorithm, SigningKeyPair};
