//! Implicit grant responses.
//!
//! The implicit flow returns tokens straight from the authorization
//! endpoint in the redirect URI fragment, with no intermediate code.
//! A grant record is still written and consumed in the same request,
//! so issuance always flows through a consumed grant.
//!
//! ## Security Considerations
//!
//! Fragment responses never carry a refresh token, and the fragment
//! never contains an authorization code. The existing query component
//! of the redirect URI is preserved untouched.

use std::sync::Arc;

use serde::Deserialize;
use time::Duration;
use url::Url;

use crate::error::AuthError;
use crate::storage::{ApplicationStorage, GrantStorage};
use crate::token::{IssuedToken, TokenIssuer};
use crate::types::{Account, Grant};
use crate::AuthResult;

/// How long an implicit grant record stays exchangeable. It is
/// consumed in the same request, so this only bounds clock skew.
const GRANT_LIFETIME: Duration = Duration::minutes(5);

/// Parameters of an authorization endpoint request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRequest {
    /// The requested response type.
    pub response_type: String,

    /// The requesting client.
    pub client_id: String,

    /// Where the fragment response is delivered.
    pub redirect_uri: Url,

    /// Requested scopes, space-separated.
    pub scope: Option<String>,

    /// Opaque client state, echoed back verbatim.
    pub state: Option<String>,
}

impl AuthorizeRequest {
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

/// A token response delivered in the redirect URI fragment.
#[derive(Debug, Clone)]
pub struct FragmentResponse {
    /// The full redirect target, fragment included.
    pub redirect_uri: Url,

    /// The issued token behind the fragment.
    pub issued: IssuedToken,
}

impl FragmentResponse {
    fn new(mut redirect_uri: Url, issued: IssuedToken, state: Option<&str>) -> Self {
        let mut fragment = url::form_urlencoded::Serializer::new(String::new());
        fragment
            .append_pair("access_token", &issued.access_token)
            .append_pair("token_type", issued.token_type)
            .append_pair("expires_in", &issued.expires_in.to_string())
            .append_pair("scope", &issued.scope);
        if let Some(state) = state {
            fragment.append_pair("state", state);
        }
        redirect_uri.set_fragment(Some(&fragment.finish()));

        Self {
            redirect_uri,
            issued,
        }
    }
}

/// Answers authorization requests whose response type is `token`.
pub struct ImplicitGrantResponder {
    issuer: Arc<TokenIssuer>,
    applications: Arc<dyn ApplicationStorage>,
    grants: Arc<dyn GrantStorage>,
}

impl ImplicitGrantResponder {
    /// Creates a new responder.
    #[must_use]
    pub fn new(
        issuer: Arc<TokenIssuer>,
        applications: Arc<dyn ApplicationStorage>,
        grants: Arc<dyn GrantStorage>,
    ) -> Self {
        Self {
            issuer,
            applications,
            grants,
        }
    }

    /// Issues tokens for an authenticated account and builds the
    /// fragment redirect.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_response_type` for any response type other
    /// than `token`, `invalid_client` for an unknown `client_id`, and
    /// issuance errors verbatim.
    pub async fn respond(
        &self,
        request: &AuthorizeRequest,
        account: &Account,
    ) -> AuthResult<FragmentResponse> {
        if request.response_type != "token" {
            return Err(AuthError::unsupported_response_type(&request.response_type));
        }

        let application = self
            .applications
            .find_by_client_id(&request.client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("unknown client_id"))?;

        let scopes = request.scopes();
        let grant = self
            .grants
            .create(Grant::new(
                account.id,
                application.id,
                scopes.clone(),
                GRANT_LIFETIME,
            ))
            .await?;
        let grant = self
            .grants
            .consume(grant.id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("grant could not be consumed"))?;

        let issued = self
            .issuer
            .issue(account, &application, &grant.scopes, false)
            .await?;

        tracing::debug!(
            client_id = %application.client_id,
            grant_id = %grant.id,
            "implicit grant fragment response"
        );

        Ok(FragmentResponse::new(
            request.redirect_uri.clone(),
            issued,
            request.state.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::config::AuthConfig;
    use crate::jwks::{RemoteJwksClient, RemoteJwksConfig};
    use crate::jwt::{JwtCodec, KeyMaterial, SigningAlgorithm, SigningKeyPair};
    use crate::storage::TokenStorage;
    use crate::types::{Application, TokenRecord};

    use super::*;

    struct MockApplications(Mutex<HashMap<String, Application>>);

    #[async_trait]
    impl ApplicationStorage for MockApplications {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Application>> {
            Ok(self.0.lock().unwrap().get(client_id).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Application>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .values()
                .find(|app| app.id == id)
                .cloned())
        }
    }

    struct MockGrants(Mutex<HashMap<Uuid, Grant>>);

    #[async_trait]
    impl GrantStorage for MockGrants {
        async fn create(&self, grant: Grant) -> AuthResult<Grant> {
            self.0.lock().unwrap().insert(grant.id, grant.clone());
            Ok(grant)
        }

        async fn consume(&self, id: Uuid) -> AuthResult<Option<Grant>> {
            let mut grants = self.0.lock().unwrap();
            let Some(grant) = grants.get_mut(&id) else {
                return Ok(None);
            };
            if grant.is_used() || grant.is_expired() {
                return Ok(None);
            }
            grant.used_at = Some(OffsetDateTime::now_utc());
            Ok(Some(grant.clone()))
        }
    }

    struct MockTokens(Mutex<Vec<TokenRecord>>);

    #[async_trait]
    impl TokenStorage for MockTokens {
        async fn create(&self, record: TokenRecord) -> AuthResult<TokenRecord> {
            self.0.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_by_jti(&self, jti: &str) -> AuthResult<Option<TokenRecord>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.jti == jti)
                .cloned())
        }

        async fn find_by_refresh_token(&self, _: &str) -> AuthResult<Option<TokenRecord>> {
            Ok(None)
        }

        async fn revoke(&self, _: Uuid) -> AuthResult<bool> {
            Ok(false)
        }
    }

    struct Fixture {
        responder: ImplicitGrantResponder,
        grants: Arc<MockGrants>,
    }

    fn fixture() -> Fixture {
        let config = Arc::new(AuthConfig::new("https://auth.example.com"));
        let keys = Arc::new(KeyMaterial::new(
            SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap(),
        ));
        let codec = Arc::new(JwtCodec::new(
            Arc::clone(&config),
            keys,
            Arc::new(RemoteJwksClient::new(
                RemoteJwksConfig::default().with_allow_http(true),
            )),
        ));
        let issuer = Arc::new(TokenIssuer::new(
            config,
            codec,
            Arc::new(MockTokens(Mutex::new(Vec::new()))),
        ));

        let application = Application::new(
            "spa-client",
            "Browser App",
            vec!["read".to_string(), "write".to_string()],
        );
        let applications = Arc::new(MockApplications(Mutex::new(HashMap::from([(
            "spa-client".to_string(),
            application,
        )]))));
        let grants = Arc::new(MockGrants(Mutex::new(HashMap::new())));

        Fixture {
            responder: ImplicitGrantResponder::new(issuer, applications, Arc::clone(&grants) as _),
            grants,
        }
    }

    fn authorize_request() -> AuthorizeRequest {
        AuthorizeRequest {
            response_type: "token".to_string(),
            client_id: "spa-client".to_string(),
            redirect_uri: Url::parse("https://app.example.com/cb?keep=me").unwrap(),
            scope: Some("read".to_string()),
            state: Some("xyz&abc".to_string()),
        }
    }

    fn fragment_pairs(url: &Url) -> HashMap<String, String> {
        url::form_urlencoded::parse(url.fragment().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    #[tokio::test]
    async fn test_fragment_response_shape() {
        let f = fixture();
        let account = Account::new("user@example.com");

        let response = f.responder.respond(&authorize_request(), &account).await.unwrap();
        let pairs = fragment_pairs(&response.redirect_uri);

        assert_eq!(pairs["access_token"], response.issued.access_token);
        assert_eq!(pairs["token_type"], "bearer");
        assert_eq!(pairs["expires_in"], "3600");
        assert_eq!(pairs["scope"], "read");
        assert_eq!(pairs["state"], "xyz&abc");
        assert!(!pairs.contains_key("code"));
        assert!(!pairs.contains_key("refresh_token"));
        assert!(response.issued.refresh_token.is_none());

        // The original query survives.
        assert_eq!(response.redirect_uri.query(), Some("keep=me"));
        assert_eq!(response.redirect_uri.path(), "/cb");
    }

    #[tokio::test]
    async fn test_state_omitted_when_absent() {
        let f = fixture();
        let mut request = authorize_request();
        request.state = None;

        let response = f
            .responder
            .respond(&request, &Account::new("u"))
            .await
            .unwrap();
        assert!(!fragment_pairs(&response.redirect_uri).contains_key("state"));
    }

    #[tokio::test]
    async fn test_non_token_response_type_rejected() {
        let f = fixture();
        let mut request = authorize_request();
        request.response_type = "code".to_string();

        let err = f
            .responder
            .respond(&request, &Account::new("u"))
            .await
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_response_type");
    }

    #[tokio::test]
    async fn test_unknown_client_rejected() {
        let f = fixture();
        let mut request = authorize_request();
        request.client_id = "nobody".to_string();

        let err = f
            .responder
            .respond(&request, &Account::new("u"))
            .await
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn test_grant_recorded_and_consumed() {
        let f = fixture();
        let account = Account::new("u");

        f.responder
            .respond(&authorize_request(), &account)
            .await
            .unwrap();

        let grants = f.grants.0.lock().unwrap();
        assert_eq!(grants.len(), 1);
        let grant = grants.values().next().unwrap();
        assert!(grant.is_used());
        assert_eq!(grant.account_id, account.id);
        assert_eq!(grant.scopes, vec!["read".to_string()]);
    }
}
