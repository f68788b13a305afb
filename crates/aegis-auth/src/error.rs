//! Authorization server error types.
//!
//! This module defines all error types that can occur during token
//! issuance, grant authentication, and key management operations.

use std::fmt;

/// Errors that can occur during token issuance and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The authorization grant, assertion, or refresh token is invalid.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The request is malformed or missing a required parameter.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The client credentials or client assertion are invalid.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The requested scope is invalid, unknown, or exceeds the grant.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The presented bearer token is invalid, expired, or malformed.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// A remote JSON Web Key Set could not be fetched or parsed.
    #[error("Remote key set unavailable: {message}")]
    RemoteKeySet {
        /// Description of the fetch failure.
        message: String,
    },

    /// A generated value collided with an existing stored record.
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        /// Description of the colliding value.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The server configuration is unusable (missing keys, unknown
    /// subject type). Fatal at startup or first use, never retried.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `RemoteKeySet` error.
    #[must_use]
    pub fn remote_key_set(message: impl Into<String>) -> Self {
        Self::RemoteKeySet {
            message: message.into(),
        }
    }

    /// Creates a new `UniqueViolation` error.
    #[must_use]
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is attributable to the caller.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGrant { .. }
                | Self::InvalidRequest { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidScope { .. }
                | Self::InvalidToken { .. }
                | Self::UnsupportedResponseType { .. }
                | Self::UnsupportedGrantType { .. }
        )
    }

    /// Returns `true` if this is a server-side fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
                | Self::UniqueViolation { .. }
        )
    }

    /// Returns `true` for fatal configuration errors that must not be
    /// retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidGrant { .. } | Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::InvalidRequest { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::RemoteKeySet { .. } => ErrorCategory::KeyManagement,
            Self::UniqueViolation { .. } | Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidToken { .. } => "invalid_token",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            // A remote key set failure during inbound validation is
            // indistinguishable from an invalid token for the caller.
            Self::RemoteKeySet { .. } => "invalid_token",
            Self::UniqueViolation { .. } => "invalid_request",
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification errors (grants, assertions, clients).
    Authentication,
    /// Permission/scope errors.
    Authorization,
    /// Bearer token validation errors.
    Token,
    /// Request validation errors.
    Validation,
    /// Remote or local key material errors.
    KeyManagement,
    /// Storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::KeyManagement => write!(f, "key_management"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
