//! Authorization server metadata.
//!
//! The RFC 8414 discovery document, served at
//! `/.well-known/oauth-authorization-server`. Fields reflect what the
//! server actually supports: the key material's algorithms and the
//! grant types registered at startup.

use serde::Serialize;

use crate::config::AuthConfig;
use crate::jwt::KeyMaterial;

/// The discovery document body.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    pub issuer: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    pub jwks_uri: String,

    pub response_types_supported: Vec<String>,

    pub response_modes_supported: Vec<String>,

    pub grant_types_supported: Vec<String>,

    pub subject_types_supported: Vec<String>,

    pub token_endpoint_auth_methods_supported: Vec<String>,

    pub token_endpoint_auth_signing_alg_values_supported: Vec<String>,
}

impl ServerMetadata {
    /// Builds the document from configuration and key material.
    ///
    /// `assertion_grant_urns` lists the grant type URNs with a
    /// registered handler; the implicit grant is always advertised.
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        keys: &KeyMaterial,
        assertion_grant_urns: Vec<String>,
    ) -> Self {
        let issuer = config.issuer.trim_end_matches('/').to_string();

        let mut grant_types = vec!["implicit".to_string()];
        grant_types.extend(assertion_grant_urns);

        let mut signing_algs: Vec<String> = keys
            .algorithms()
            .iter()
            .map(|alg| alg.as_str().to_string())
            .collect();
        let configured = config.signing_algorithm.as_str().to_string();
        if !signing_algs.contains(&configured) {
            signing_algs.push(configured);
        }

        Self {
            jwks_uri: format!("{issuer}/jwks"),
            authorization_endpoint: Some(format!("{issuer}/authorize")),
            token_endpoint: Some(format!("{issuer}/token")),
            introspection_endpoint: Some(format!("{issuer}/introspect")),
            response_types_supported: vec!["token".to_string()],
            response_modes_supported: vec!["fragment".to_string()],
            grant_types_supported: grant_types,
            subject_types_supported: vec![config.subject_type.as_str().to_string()],
            token_endpoint_auth_methods_supported: vec!["private_key_jwt".to_string()],
            token_endpoint_auth_signing_alg_values_supported: signing_algs,
            issuer,
        }
    }
}
