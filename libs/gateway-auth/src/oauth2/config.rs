use std::fmt;
use std::time::Duration;
use url::Url;

use super::error::TokenError;
use crate::SecretString;

/// Credentials and refresh policy for an outbound `OAuth2` client
/// credentials session.
///
/// Call [`validate`](Self::validate) before any network I/O;
/// [`TokenSession::new`](super::TokenSession::new) does this for you.
///
/// `Debug` is manually implemented to redact [`client_secret`](Self::client_secret).
pub struct OAuthClientConfig {
    /// Token endpoint URL.
    pub token_endpoint: Option<Url>,

    // ---- credentials --------------------------------------------------------
    pub client_id: String,

    /// `OAuth2` client secret (redacted in `Debug` output).
    pub client_secret: SecretString,

    // ---- refresh policy -----------------------------------------------------
    /// How far before expiry the token should be refreshed (default: 30 min).
    pub refresh_offset: Duration,

    /// Maximum random jitter added to the refresh offset (default: 5 min).
    pub jitter_max: Duration,

    /// Minimum period between consecutive refresh attempts (default: 10 s).
    pub min_refresh_period: Duration,

    /// Fallback TTL when the token endpoint omits `expires_in` (default: 5 min).
    pub default_ttl: Duration,

    // ---- HTTP client --------------------------------------------------------
    /// Override for the token endpoint HTTP client configuration.
    /// When `None`,
    /// [`HttpClientConfig::token_endpoint()`](gateway_http::HttpClientConfig::token_endpoint)
    /// with webpki roots and TLS only is used.
    pub http_config: Option<gateway_http::HttpClientConfig>,
}

impl OAuthClientConfig {
    /// Validate that the configuration is complete.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the client id or client secret
    /// is empty, or the token endpoint is missing.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.client_id.trim().is_empty() {
            return Err(TokenError::Config("client_id must not be empty".into()));
        }
        if self.client_secret.is_empty() {
            return Err(TokenError::Config("client_secret must not be empty".into()));
        }
        if self.token_endpoint.is_none() {
            return Err(TokenError::Config("token_endpoint is required".into()));
        }
        Ok(())
    }
}

impl Clone for OAuthClientConfig {
    fn clone(&self) -> Self {
        Self {
            token_endpoint: self.token_endpoint.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_offset: self.refresh_offset,
            jitter_max: self.jitter_max,
            min_refresh_period: self.min_refresh_period,
            default_ttl: self.default_ttl,
            http_config: self.http_config.clone(),
        }
    }
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_offset", &self.refresh_offset)
            .field("jitter_max", &self.jitter_max)
            .field("min_refresh_period", &self.min_refresh_period)
            .field("default_ttl", &self.default_ttl)
            .field("http_config", &self.http_config)
            .finish()
    }
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            token_endpoint: None,
            client_id: String::new(),
            client_secret: SecretString::new(String::new()),
            refresh_offset: Duration::from_secs(30 * 60),
            jitter_max: Duration::from_secs(5 * 60),
            min_refresh_period: Duration::from_secs(10),
            default_ttl: Duration::from_secs(5 * 60),
            http_config: None,
        }
    }
}
