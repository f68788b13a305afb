//! Token introspection HTTP handler.
//!
//! The RFC 7662 endpoint. Caller authentication is the embedding
//! application's concern; this handler only answers for an already
//! authorized caller.

use std::sync::Arc;

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::token::Introspector;

/// State for the introspection endpoint.
#[derive(Clone)]
pub struct IntrospectState {
    /// The introspector answering requests.
    pub introspector: Arc<Introspector>,
}

impl IntrospectState {
    /// Creates a new introspection state.
    pub fn new(introspector: Arc<Introspector>) -> Self {
        Self { introspector }
    }
}

/// Form body of an introspection request.
#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    /// The token value under introspection.
    pub token: String,

    /// Optional caller hint, accepted and ignored; both token kinds
    /// are tried regardless.
    pub token_type_hint: Option<String>,
}

/// Handler for `POST /introspect`.
///
/// Returns 200 OK with the introspection payload. Invalid or unknown
/// tokens answer `{"active": false}`; only storage faults surface as
/// 500.
pub async fn introspect_handler(
    State(state): State<IntrospectState>,
    Form(request): Form<IntrospectRequest>,
) -> impl IntoResponse {
    match state.introspector.introspect(&request.token).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(e) => {
            tracing::warn!("introspection failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_form_deserialization() {
        let request: IntrospectRequest =
            serde_urlencoded::from_str("token=abc&token_type_hint=refresh_token").unwrap();
        assert_eq!(request.token, "abc");
        assert_eq!(request.token_type_hint.as_deref(), Some("refresh_token"));

        let request: IntrospectRequest = serde_urlencoded::from_str("token=abc").unwrap();
        assert!(request.token_type_hint.is_none());
    }
}
