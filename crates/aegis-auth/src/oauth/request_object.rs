//! Signed authorization request objects.
//!
//! A client may pass its authorization parameters as a signed JWT
//! (`request=...`) instead of bare query parameters. The signature is
//! verified against the client's registered keys and the claims become
//! the authoritative request parameters.

use std::sync::Arc;

use serde_json::Value;

use crate::error::AuthError;
use crate::jwks::RemoteJwksClient;
use crate::jwt::{DecodeOptions, JwtCodec};
use crate::oauth::assertion::application_jwk_set;
use crate::types::Application;
use crate::AuthResult;

/// Verifies signed request objects for the authorization endpoint.
pub struct RequestObjectVerifier {
    codec: Arc<JwtCodec>,
    jwks_client: Arc<RemoteJwksClient>,
}

impl RequestObjectVerifier {
    /// Creates a new verifier.
    #[must_use]
    pub fn new(codec: Arc<JwtCodec>, jwks_client: Arc<RemoteJwksClient>) -> Self {
        Self { codec, jwks_client }
    }

    /// Verifies `request_object` against the client's registered keys
    /// and returns its claim set.
    ///
    /// Request objects carry no access token lifetime, so the `exp`
    /// claim is optional; when `aud` is present it must name this
    /// server.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` when the signature does not verify,
    /// the audience names another server, or the claims disagree with
    /// the requesting client.
    pub async fn verify(
        &self,
        request_object: &str,
        application: &Application,
    ) -> AuthResult<Value> {
        let jwks = application_jwk_set(application, &self.jwks_client).await?;

        let options = DecodeOptions::new()
            .with_verify_exp(false)
            .with_verify_iss(false)
            .with_caller_jwks(jwks);
        let claims = self
            .codec
            .decode_value(request_object, &options)
            .await
            .ok_or_else(|| AuthError::invalid_request("request object verification failed"))?;

        if let Some(aud) = claims.get("aud")
            && !names_server(aud, &self.codec.config().issuer)
        {
            return Err(AuthError::invalid_request(
                "request object audience is not this server",
            ));
        }

        if let Some(client_id) = claims.get("client_id").and_then(Value::as_str)
            && client_id != application.client_id
        {
            return Err(AuthError::invalid_request(
                "request object client_id does not match the requesting client",
            ));
        }

        Ok(claims)
    }
}

/// Checks whether an `aud` value (string or array) names `issuer`.
fn names_server(aud: &Value, issuer: &str) -> bool {
    match aud {
        Value::String(s) => s == issuer,
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(issuer)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jsonwebtoken::{Header, encode};
    use time::OffsetDateTime;

    use crate::config::AuthConfig;
    use crate::jwks::RemoteJwksConfig;
    use crate::jwt::{KeyMaterial, SigningAlgorithm, SigningKeyPair};

    use super::*;

    struct Fixture {
        verifier: RequestObjectVerifier,
        client_key: SigningKeyPair,
        application: Application,
    }

    fn fixture() -> Fixture {
        let config = Arc::new(AuthConfig::new("https://auth.example.com"));
        let keys = Arc::new(KeyMaterial::new(
            SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap(),
        ));
        let jwks_client = Arc::new(RemoteJwksClient::new(
            RemoteJwksConfig::default().with_allow_http(true),
        ));
        let codec = Arc::new(JwtCodec::new(config, keys, Arc::clone(&jwks_client)));

        let client_key = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let mut application = Application::new("spa-client", "App", vec!["read".to_string()]);
        application.jwks = Some(
            serde_json::json!({ "keys": [serde_json::to_value(client_key.to_jwk()).unwrap()] }),
        );

        Fixture {
            verifier: RequestObjectVerifier::new(codec, jwks_client),
            client_key,
            application,
        }
    }

    fn sign(key: &SigningKeyPair, claims: &Value) -> String {
        let mut header = Header::new(key.algorithm.to_jwt_algorithm());
        header.kid = Some(key.kid.clone());
        encode(&header, claims, &key.encoding_key).unwrap()
    }

    fn request_claims() -> Value {
        serde_json::json!({
            "iss": "spa-client",
            "client_id": "spa-client",
            "response_type": "token",
            "redirect_uri": "https://app.example.com/cb",
            "scope": "read",
            "iat": OffsetDateTime::now_utc().unix_timestamp(),
        })
    }

    #[tokio::test]
    async fn test_valid_request_object() {
        let f = fixture();
        let token = sign(&f.client_key, &request_claims());

        let claims = f.verifier.verify(&token, &f.application).await.unwrap();
        assert_eq!(claims["response_type"], "token");
        assert_eq!(claims["scope"], "read");
    }

    #[tokio::test]
    async fn test_audience_must_name_this_server_when_present() {
        let f = fixture();

        let mut claims = request_claims();
        claims["aud"] = Value::String("https://auth.example.com".to_string());
        let token = sign(&f.client_key, &claims);
        assert!(f.verifier.verify(&token, &f.application).await.is_ok());

        claims["aud"] = Value::String("https://other.example.com".to_string());
        let token = sign(&f.client_key, &claims);
        let err = f.verifier.verify(&token, &f.application).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let f = fixture();
        let stranger = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let token = sign(&stranger, &request_claims());

        let err = f.verifier.verify(&token, &f.application).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_client_id_mismatch_rejected() {
        let f = fixture();
        let mut claims = request_claims();
        claims["client_id"] = Value::String("someone-else".to_string());
        let token = sign(&f.client_key, &claims);

        let err = f.verifier.verify(&token, &f.application).await.unwrap_err();
        assert!(err.to_string().contains("client_id"));
    }

    #[tokio::test]
    async fn test_keyless_application_rejected() {
        let f = fixture();
        let bare = Application::new("bare", "No Keys", vec![]);
        let token = sign(&f.client_key, &request_claims());

        assert!(f.verifier.verify(&token, &bare).await.is_err());
    }
}
