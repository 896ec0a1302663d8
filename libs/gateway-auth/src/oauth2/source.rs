use std::time::Duration;

use aliri_clock::DurationSecs;
use aliri_tokens::sources::AsyncTokenSource;
use aliri_tokens::{AccessToken, IdToken, TokenLifetimeConfig, TokenWithLifetime};
use async_trait::async_trait;
use gateway_http::{HttpClientConfig, TlsRootConfig, TransportSecurity};
use url::Url;
use zeroize::Zeroizing;

use super::config::OAuthClientConfig;
use super::error::TokenError;
use super::types::TokenResponse;
use crate::SecretString;

/// Exchanges client credentials for an access token.
///
/// Implements [`AsyncTokenSource`] so that `aliri_tokens` drives refresh
/// scheduling, jitter and error backoff. Credentials travel in the form body
/// (`grant_type`, `client_id`, `client_secret`); the request is never retried
/// and never wire-logged.
pub struct OAuthTokenSource {
    client: gateway_http::HttpClient,
    token_endpoint: Url,
    client_id: String,
    client_secret: SecretString,
    default_ttl: Duration,
    refresh_offset: Duration,
    min_refresh_period: Duration,
}

impl OAuthTokenSource {
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if `token_endpoint` is `None` or the
    /// HTTP client cannot be built for it.
    pub fn new(config: &OAuthClientConfig) -> Result<Self, TokenError> {
        let token_endpoint = config
            .token_endpoint
            .clone()
            .ok_or_else(|| TokenError::Config("token_endpoint is required".into()))?;

        let mut http_config = config.http_config.clone().unwrap_or_else(|| {
            HttpClientConfig::token_endpoint(TlsRootConfig::default(), TransportSecurity::TlsOnly)
        });
        // The grant carries the client secret in its body.
        http_config.wire_log = false;

        let client = gateway_http::HttpClientBuilder::with_config(http_config)
            .build()
            .map_err(|e| TokenError::Config(format!("token endpoint client: {e}")))?;

        Ok(Self {
            client,
            token_endpoint,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            default_ttl: config.default_ttl,
            refresh_offset: config.refresh_offset,
            min_refresh_period: config.min_refresh_period,
        })
    }

    /// POST the grant form and decode a 2xx body as a token response
    ///
    /// The `HttpError` text carries the status only, so an echoed secret in
    /// an error body cannot reach the message.
    async fn grant(&self, fields: &[(&str, &str)]) -> Result<TokenResponse, TokenError> {
        let failed = |e: gateway_http::HttpError| TokenError::Grant {
            endpoint: self.token_endpoint.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(self.token_endpoint.as_str())
            .form(fields)
            .map_err(failed)?
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;

        response.json().await.map_err(|e| match e {
            gateway_http::HttpError::DecodeJson(err) => TokenError::Malformed(err.to_string()),
            other => failed(other),
        })
    }
}

#[async_trait]
impl AsyncTokenSource for OAuthTokenSource {
    type Error = TokenError;

    async fn request_token(&mut self) -> Result<TokenWithLifetime, Self::Error> {
        tracing::debug!(
            endpoint = %self.token_endpoint,
            client_id = %self.client_id,
            "Requesting OAuth2 token"
        );

        // Scrubbed on drop.
        let secret = Zeroizing::new(self.client_secret.expose().to_owned());
        let fields = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret.as_str()),
        ];

        let token_resp = self.grant(&fields).await?;

        if let Some(ref tt) = token_resp.token_type
            && !tt.eq_ignore_ascii_case("bearer")
        {
            return Err(TokenError::NotBearer(tt.clone()));
        }

        let lifetime_secs = token_resp.expires_in.unwrap_or(self.default_ttl.as_secs());
        let (freshness, min_stale) =
            refresh_params(lifetime_secs, self.refresh_offset, self.min_refresh_period);
        let lifetime_config = TokenLifetimeConfig::new(freshness, min_stale);

        let access_token = AccessToken::new(token_resp.access_token);
        let token = lifetime_config.create_token(
            &access_token,
            None::<&IdToken>,
            DurationSecs(lifetime_secs),
        );

        tracing::debug!(expires_in = lifetime_secs, "Obtained OAuth2 token");
        Ok(token)
    }
}

/// Compute `(freshness_period, min_staleness_period)` for
/// [`TokenLifetimeConfig`].
///
/// Guarantees `max(lifetime * freshness, min_stale) <= lifetime`, so a token
/// always turns stale no later than it expires:
///
/// - `offset < lifetime`: stale `offset` seconds before expiry.
/// - otherwise: stale at half the lifetime.
/// - zero lifetime: stale immediately.
#[allow(clippy::integer_division, clippy::cast_precision_loss)]
fn refresh_params(
    lifetime_secs: u64,
    refresh_offset: Duration,
    min_refresh_period: Duration,
) -> (f64, DurationSecs) {
    if lifetime_secs == 0 {
        return (0.0, DurationSecs(0));
    }

    let offset = refresh_offset.as_secs();
    let desired_delay = if offset < lifetime_secs {
        lifetime_secs - offset
    } else {
        lifetime_secs / 2
    };

    let freshness = (desired_delay as f64) / (lifetime_secs as f64);
    let min_stale = min_refresh_period.as_secs().min(desired_delay);

    (freshness, DurationSecs(min_stale))
}
