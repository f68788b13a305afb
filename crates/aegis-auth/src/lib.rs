//! # aegis-auth
//!
//! Token issuance and verification core for the Aegis authorization
//! server.
//!
//! This crate provides:
//! - JWT access token minting and verification (JWS, optional JWE)
//! - Signing key management with rotation and JWKS publication
//! - Remote JWKS fetching with header-driven caching
//! - Assertion grant authentication (JWT bearer, client assertions)
//! - Implicit grant fragment responses
//! - OAuth server metadata and token introspection
//!
//! ## Overview
//!
//! The crate is the engine behind a token endpoint: the embedding
//! application routes HTTP requests and owns persistence, while this
//! crate decides whether a grant authenticates, which claims a token
//! carries, and whether a presented token verifies.
//!
//! ## Modules
//!
//! - [`config`] - Server role, issuer, lifetime, and key policy configuration
//! - [`cache`] - Generic TTL cache with per-key request coalescing
//! - [`jwks`] - Remote JSON Web Key Set client
//! - [`jwt`] - Key material, claims, and the JWT codec
//! - [`token`] - Access token issuance and introspection
//! - [`oauth`] - Assertion grant engine, implicit grant, request objects
//! - [`discovery`] - Authorization server metadata document
//! - [`storage`] - Storage traits for auth-related data
//! - [`http`] - Axum HTTP handlers for the discovery surfaces

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use cache::TtlCache;
pub use config::{AuthConfig, EncryptionConfig, ServerRole, SubjectType};
pub use discovery::ServerMetadata;
pub use error::{AuthError, ErrorCategory};
pub use http::{
    DiscoveryState, IntrospectRequest, IntrospectState, JwksState, introspect_handler,
    jwks_handler, metadata_handler,
};
pub use jwks::{RemoteJwksClient, RemoteJwksConfig};
pub use jwt::{
    AccessTokenClaims, DecodeOptions, JwtCodec, KeyMaterial, SigningAlgorithm, SigningKeyPair,
    generate_jti,
};
pub use oauth::{
    AssertionEngine, AssertionGrantHandler, AssertionPrincipal, AssertionRegistry,
    AuthorizeRequest, ClientAssertionHandler, FragmentResponse, ImplicitGrantResponder,
    JwtBearerHandler, RequestObjectVerifier, TokenRequest, TokenResponse, assertion_grant_type,
    client_assertion_type,
};
pub use storage::{
    AccountStorage, ApplicationStorage, GrantStorage, JtiStorage, TokenStorage,
};
pub use token::{IntrospectionPayload, Introspector, IssuedToken, TokenIssuer};
pub use types::{Account, Application, Grant, TokenRecord};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use aegis_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::cache::TtlCache;
    pub use crate::config::{AuthConfig, EncryptionConfig, ServerRole, SubjectType};
    pub use crate::discovery::ServerMetadata;
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::jwks::{RemoteJwksClient, RemoteJwksConfig};
    pub use crate::jwt::{
        AccessTokenClaims, DecodeOptions, JwtCodec, KeyMaterial, SigningAlgorithm, SigningKeyPair,
    };
    pub use crate::oauth::{
        AssertionEngine, AssertionGrantHandler, AssertionRegistry, ClientAssertionHandler,
        ImplicitGrantResponder, JwtBearerHandler, TokenRequest, TokenResponse,
    };
    pub use crate::storage::{
        AccountStorage, ApplicationStorage, GrantStorage, JtiStorage, TokenStorage,
    };
    pub use crate::token::{IntrospectionPayload, Introspector, IssuedToken, TokenIssuer};
    pub use crate::types::{Account, Application, Grant, TokenRecord};
}
