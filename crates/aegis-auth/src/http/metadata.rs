//! Authorization server metadata HTTP handler.
//!
//! Serves the RFC 8414 discovery document at
//! `/.well-known/oauth-authorization-server`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::discovery::ServerMetadata;

/// State for the discovery endpoint.
///
/// The document is assembled once at startup; nothing in it changes
/// at request time.
#[derive(Clone)]
pub struct DiscoveryState {
    /// The prepared metadata document.
    pub metadata: Arc<ServerMetadata>,
}

impl DiscoveryState {
    /// Creates a new discovery state.
    pub fn new(metadata: ServerMetadata) -> Self {
        Self {
            metadata: Arc::new(metadata),
        }
    }
}

/// Handler for `GET /.well-known/oauth-authorization-server`.
pub async fn metadata_handler(State(state): State<DiscoveryState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(state.metadata.as_ref().clone()),
    )
}

#[cfg(test)]
mod tests {
    use crate::config::AuthConfig;
    use crate::jwt::{KeyMaterial, SigningAlgorithm, SigningKeyPair};

    use super::*;

    #[test]
    fn test_discovery_state_shares_document() {
        let config = AuthConfig::new("https://auth.example.com");
        let keys = KeyMaterial::new(SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap());
        let state = DiscoveryState::new(ServerMetadata::new(&config, &keys, Vec::new()));
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.metadata, &cloned.metadata));
        assert_eq!(cloned.metadata.issuer, "https://auth.example.com");
    }
}
