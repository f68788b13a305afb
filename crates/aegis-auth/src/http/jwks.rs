//! JWKS endpoint HTTP handler.
//!
//! Serves the server's public signing keys so callers can verify
//! issued tokens.
//!
//! # References
//!
//! - [RFC 7517 - JSON Web Key](https://tools.ietf.org/html/rfc7517)

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::jwt::KeyMaterial;

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// The key material whose public halves are published.
    pub keys: Arc<KeyMaterial>,
}

impl JwksState {
    /// Creates a new JWKS state.
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }
}

/// Handler for `GET /jwks`.
///
/// Returns 200 OK with the JWKS document and a `Cache-Control` header
/// allowing caching for 1 hour. During key rotation both the current
/// and legacy keys appear in the set.
pub async fn jwks_handler(State(state): State<JwksState>) -> impl IntoResponse {
    let jwks = state.keys.published_jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
