//! Registered OAuth application (client) record.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::SubjectType;

/// A registered OAuth client application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Unique application id.
    pub id: Uuid,

    /// OAuth client identifier.
    pub client_id: String,

    /// Human-readable name.
    pub name: String,

    /// Scopes the application is allowed to request. The full set is
    /// also the default when a token request names none.
    pub scopes: Vec<String>,

    /// Registered JWKS document, used to verify assertions the
    /// application signs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<serde_json::Value>,

    /// Endpoint publishing the application's JWKS. Consulted when no
    /// inline document is registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<Url>,

    /// Per-application subject type override.
    #[serde(skip)]
    pub subject_type: Option<SubjectType>,
}

impl Application {
    /// Creates a new application with a random id and the given
    /// allowed scopes.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        name: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            name: name.into(),
            scopes,
            jwks: None,
            jwks_uri: None,
            subject_type: None,
        }
    }

    /// Returns `true` if every requested scope is allowed for this
    /// application.
    #[must_use]
    pub fn allows_scopes(&self, requested: &[String]) -> bool {
        requested.iter().all(|scope| self.scopes.contains(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_scopes() {
        let app = Application::new(
            "client-1",
            "Test App",
            vec!["read".to_string(), "write".to_string()],
        );

        assert!(app.allows_scopes(&["read".to_string()]));
        assert!(app.allows_scopes(&["read".to_string(), "write".to_string()]));
        assert!(app.allows_scopes(&[]));
        assert!(!app.allows_scopes(&["admin".to_string()]));
    }
}
