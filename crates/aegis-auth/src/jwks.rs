//! Remote JSON Web Key Set client.
//!
//! [`RemoteJwksClient`] fetches JWKS documents over HTTPS and caches
//! them in a shared [`TtlCache`] keyed by normalized URI. It serves
//! two call sites: verifying client assertions against an
//! application's registered `jwks_uri`, and (in the resource server
//! role) verifying access tokens against the authorization server's
//! published key set.
//!
//! # Cache lifetime
//!
//! The cache TTL follows the upstream response headers:
//! `Cache-Control: max-age=N` wins, then `Expires` minus the current
//! time, and with neither header the key set is cached until explicit
//! invalidation or process restart.
//!
//! # Security Considerations
//!
//! - Only HTTPS URIs are allowed (configurable for testing)
//! - HTTP timeouts prevent hanging on slow endpoints
//! - Response size is bounded
//! - A fetch failure fails the request, never the cache

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use url::Url;

use crate::cache::TtlCache;
use crate::error::AuthError;
use crate::AuthResult;

/// Configuration for the remote JWKS client.
#[derive(Debug, Clone)]
pub struct RemoteJwksConfig {
    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) JWKS URIs.
    /// This should only be enabled for testing.
    pub allow_http: bool,
}

impl Default for RemoteJwksConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024, // 1 MB
            allow_http: false,
        }
    }
}

impl RemoteJwksConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) JWKS URIs.
    ///
    /// # Warning
    ///
    /// This should only be used for testing. In production, JWKS
    /// endpoints should always use HTTPS.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }
}

/// Fetches and caches remote JSON Web Key Sets.
pub struct RemoteJwksClient {
    http_client: reqwest::Client,
    cache: Arc<TtlCache<String, Arc<JwkSet>>>,
    config: RemoteJwksConfig,
}

impl RemoteJwksClient {
    /// Creates a new client with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen
    /// in practice).
    #[must_use]
    pub fn new(config: RemoteJwksConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            cache: Arc::new(TtlCache::new()),
            config,
        }
    }

    /// Creates a new client with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RemoteJwksConfig::default())
    }

    /// Returns the key set published at `jwks_uri`, fetching it on a
    /// cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RemoteKeySet`] if the URI scheme is not
    /// allowed, the request fails or times out, the response status is
    /// not successful, the body exceeds the size bound, or the body is
    /// not a valid JWKS document.
    pub async fn get(&self, jwks_uri: &Url) -> AuthResult<Arc<JwkSet>> {
        let key = normalize_uri(jwks_uri);

        if self.cache.get(&key).await.is_some() {
            tracing::trace!("JWKS cache hit for {}", jwks_uri);
        }

        self.cache
            .get_or_insert_with(key, || self.fetch(jwks_uri))
            .await
    }

    /// Fetches a fresh key set, ignoring the cache.
    async fn fetch(&self, jwks_uri: &Url) -> AuthResult<(Arc<JwkSet>, Option<Duration>)> {
        self.validate_scheme(jwks_uri)?;

        tracing::debug!("Fetching JWKS from {}", jwks_uri);

        let response = self
            .http_client
            .get(jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch JWKS from {}: {}", jwks_uri, e);
                AuthError::remote_key_set(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AuthError::remote_key_set(format!(
                "status {}",
                response.status().as_u16()
            )));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_size
        {
            return Err(AuthError::remote_key_set(format!(
                "response exceeds {} bytes",
                self.config.max_response_size
            )));
        }

        let ttl = response_ttl(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::remote_key_set(e.to_string()))?;
        if body.len() > self.config.max_response_size {
            return Err(AuthError::remote_key_set(format!(
                "response exceeds {} bytes",
                self.config.max_response_size
            )));
        }

        let jwks: JwkSet = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Failed to parse JWKS from {}: {}", jwks_uri, e);
            AuthError::remote_key_set(e.to_string())
        })?;

        tracing::debug!(
            "Cached JWKS from {} with {} keys, TTL {:?}",
            jwks_uri,
            jwks.keys.len(),
            ttl
        );

        Ok((Arc::new(jwks), ttl))
    }

    /// Validates that the URI uses an allowed scheme.
    fn validate_scheme(&self, uri: &Url) -> AuthResult<()> {
        let scheme = uri.scheme();

        if scheme == "https" {
            return Ok(());
        }

        if scheme == "http" && self.config.allow_http {
            return Ok(());
        }

        Err(AuthError::remote_key_set(
            "only HTTPS JWKS endpoints are allowed",
        ))
    }

    /// Invalidates a cached key set.
    ///
    /// This forces the next `get` call to fetch a fresh document.
    pub async fn invalidate(&self, jwks_uri: &Url) {
        self.cache.invalidate(&normalize_uri(jwks_uri)).await;
        tracing::debug!("Invalidated JWKS cache for {}", jwks_uri);
    }

    /// Clears all cached key sets.
    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}

/// Normalizes a URI for use as a cache key.
fn normalize_uri(uri: &Url) -> String {
    uri.as_str().trim_end_matches('/').to_string()
}

/// Derives the cache TTL from response headers.
///
/// `Cache-Control: max-age=N` takes precedence over `Expires`. With
/// neither header the entry does not expire.
fn response_ttl(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let max_age = headers
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.split(',').find_map(|directive| {
                directive
                    .trim()
                    .strip_prefix("max-age=")
                    .and_then(|s| s.parse::<u64>().ok())
            })
        });
    if let Some(secs) = max_age {
        return Some(Duration::from_secs(secs));
    }

    headers
        .get(reqwest::header::EXPIRES)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| OffsetDateTime::parse(v, &Rfc2822).ok())
        .map(|expires| {
            let remaining = expires - OffsetDateTime::now_utc();
            if remaining.is_positive() {
                Duration::from_secs(remaining.whole_seconds() as u64)
            } else {
                Duration::ZERO
            }
        })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_jwks_body() -> serde_json::Value {
        serde_json::json!({
            "keys": [
                {
                    "kty": "RSA",
                    "kid": "key-1",
                    "use": "sig",
                    "alg": "RS256",
                    "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
                    "e": "AQAB"
                }
            ]
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = RemoteJwksConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_response_size, 1024 * 1024);
        assert!(!config.allow_http);
    }

    #[test]
    fn test_config_builder() {
        let config = RemoteJwksConfig::new()
            .with_request_timeout(Duration::from_secs(5))
            .with_max_response_size(512 * 1024)
            .with_allow_http(true);

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_size, 512 * 1024);
        assert!(config.allow_http);
    }

    #[test]
    fn test_validate_scheme() {
        let client = RemoteJwksClient::with_defaults();

        let https = Url::parse("https://example.com/jwks").unwrap();
        assert!(client.validate_scheme(&https).is_ok());

        let http = Url::parse("http://example.com/jwks").unwrap();
        assert!(client.validate_scheme(&http).is_err());

        let client = RemoteJwksClient::new(RemoteJwksConfig::default().with_allow_http(true));
        assert!(client.validate_scheme(&http).is_ok());
    }

    #[test]
    fn test_response_ttl_precedence() {
        // No headers: cache until restart.
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(response_ttl(&headers), None);

        // max-age wins.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            "public, max-age=1800".parse().unwrap(),
        );
        headers.insert(
            reqwest::header::EXPIRES,
            "Wed, 01 Jan 2031 00:00:00 GMT".parse().unwrap(),
        );
        assert_eq!(response_ttl(&headers), Some(Duration::from_secs(1800)));

        // Expires in the past clamps to zero.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::EXPIRES,
            "Wed, 01 Jan 2020 00:00:00 GMT".parse().unwrap(),
        );
        assert_eq!(response_ttl(&headers), Some(Duration::ZERO));

        // Future Expires yields a positive TTL.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::EXPIRES,
            "Wed, 01 Jan 2031 00:00:00 GMT".parse().unwrap(),
        );
        assert!(response_ttl(&headers).unwrap() > Duration::from_secs(3600));

        // Invalid max-age falls through to Expires handling.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            "max-age=invalid".parse().unwrap(),
        );
        assert_eq!(response_ttl(&headers), None);
    }

    #[test]
    fn test_normalize_uri() {
        let uri1 = Url::parse("https://example.com/jwks").unwrap();
        let uri2 = Url::parse("https://example.com/jwks/").unwrap();
        assert_eq!(normalize_uri(&uri1), normalize_uri(&uri2));
        assert_eq!(normalize_uri(&uri1), "https://example.com/jwks");
    }

    #[tokio::test]
    async fn test_single_upstream_call_within_ttl() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_jwks_body())
                    .insert_header("Cache-Control", "max-age=3600"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = RemoteJwksClient::new(RemoteJwksConfig::default().with_allow_http(true));
        let uri = Url::parse(&format!("{}/jwks", mock_server.uri())).unwrap();

        let first = client.get(&uri).await.unwrap();
        let second = client.get(&uri).await.unwrap();
        assert_eq!(first.keys.len(), 1);
        assert_eq!(second.keys.len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_after_expiry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_jwks_body())
                    .insert_header("Cache-Control", "max-age=0"),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = RemoteJwksClient::new(RemoteJwksConfig::default().with_allow_http(true));
        let uri = Url::parse(&format!("{}/jwks", mock_server.uri())).unwrap();

        client.get(&uri).await.unwrap();
        client.get(&uri).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_fails_request_not_cache() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = RemoteJwksClient::new(RemoteJwksConfig::default().with_allow_http(true));
        let uri = Url::parse(&format!("{}/jwks", mock_server.uri())).unwrap();

        let err = client.get(&uri).await.unwrap_err();
        assert!(matches!(err, AuthError::RemoteKeySet { .. }));
        // Nothing was cached for the failed fetch.
        assert!(client.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_jwks_body())
                    .insert_header("Cache-Control", "max-age=3600"),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = RemoteJwksClient::new(RemoteJwksConfig::default().with_allow_http(true));
        let uri = Url::parse(&format!("{}/jwks", mock_server.uri())).unwrap();

        client.get(&uri).await.unwrap();
        client.invalidate(&uri).await;
        client.get(&uri).await.unwrap();
    }
}
