//! Token endpoint wire types.

use serde::{Deserialize, Serialize};

use crate::token::IssuedToken;

/// Parameters of a token endpoint request.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenRequest {
    /// The requested grant type, possibly an assertion URN.
    pub grant_type: String,

    /// The assertion for assertion grants.
    pub assertion: Option<String>,

    /// Client identifier, when sent alongside an assertion.
    pub client_id: Option<String>,

    /// Client authentication assertion.
    pub client_assertion: Option<String>,

    /// Type URN of the client authentication assertion.
    pub client_assertion_type: Option<String>,

    /// Requested scopes, space-separated.
    pub scope: Option<String>,
}

impl TokenRequest {
    /// Returns the requested scopes as a list.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Successful token endpoint response body.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: issued.token_type.to_string(),
            expires_in: issued.expires_in,
            refresh_token: issued.refresh_token,
            scope: issued.scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_parsing() {
        let request = TokenRequest {
            scope: Some("read  write".to_string()),
            ..TokenRequest::default()
        };
        assert_eq!(request.scopes(), vec!["read", "write"]);

        assert!(TokenRequest::default().scopes().is_empty());
    }
}
