use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use aliri_clock::DurationSecs;
use aliri_tokens::backoff::ErrorBackoffConfig;
use aliri_tokens::jitter::RandomEarlyJitter;
use aliri_tokens::{TokenStatus, TokenWatcher};
use arc_swap::ArcSwap;

use super::config::OAuthClientConfig;
use super::error::TokenError;
use super::source::OAuthTokenSource;
use crate::SecretString;

struct SessionInner {
    watcher: TokenWatcher,
}

/// Parameters needed to (re-)spawn a [`TokenWatcher`].
struct WatcherConfig {
    jitter_max: Duration,
    min_refresh_period: Duration,
}

type SourceFactory = dyn Fn() -> Result<OAuthTokenSource, TokenError> + Send + Sync;

/// An `OAuth2` client credentials session.
///
/// Construction validates the configuration and performs the first grant;
/// a background `aliri_tokens` watcher then refreshes the token ahead of
/// expiry. Reads are lock-free through `ArcSwap`, and
/// [`refresh`](Self::refresh) swaps in a new watcher with a freshly granted
/// token, reusing the stored client id and secret.
///
/// `TokenSession` is [`Clone`] + [`Send`] + [`Sync`]; clones share the token.
#[derive(Clone)]
pub struct TokenSession {
    inner: Arc<ArcSwap<SessionInner>>,
    source_factory: Arc<SourceFactory>,
    watcher_config: Arc<WatcherConfig>,
}

impl fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSession").finish_non_exhaustive()
    }
}

impl TokenSession {
    /// Validate `config`, obtain the first token and start background refresh.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] before any network I/O if the
    /// config is incomplete, and the grant's error if the initial fetch fails.
    pub async fn new(config: OAuthClientConfig) -> Result<Self, TokenError> {
        config.validate()?;

        let watcher_config = Arc::new(WatcherConfig {
            jitter_max: config.jitter_max,
            min_refresh_period: config.min_refresh_period,
        });

        let source = OAuthTokenSource::new(&config)?;
        let watcher = spawn_watcher(source, &watcher_config).await?;
        tracing::info!(client_id = %config.client_id, "OAuth2 session established");

        let source_factory: Arc<SourceFactory> = Arc::new(move || OAuthTokenSource::new(&config));

        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(SessionInner { watcher })),
            source_factory,
            watcher_config,
        })
    }

    /// Current access token, without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] if the cached token has expired
    /// and the watcher has not replaced it yet.
    pub fn current(&self) -> Result<SecretString, TokenError> {
        let guard = self.inner.load();
        let borrowed = guard.watcher.token();
        if matches!(borrowed.token_status(), TokenStatus::Expired) {
            return Err(TokenError::Expired("refresh pending".into()));
        }
        Ok(SecretString::new(borrowed.access_token().as_str()))
    }

    /// Access token that is valid at the time of the call.
    ///
    /// Falls back to a synchronous [`refresh`](Self::refresh) when the cached
    /// token has expired.
    ///
    /// # Errors
    ///
    /// Returns the grant's error if the refresh fails.
    pub async fn bearer(&self) -> Result<SecretString, TokenError> {
        match self.current() {
            Ok(token) => Ok(token),
            Err(TokenError::Expired(_)) => {
                tracing::debug!("Cached OAuth2 token expired; refreshing before use");
                self.refresh().await?;
                self.current()
            }
            Err(e) => Err(e),
        }
    }

    /// Obtain a new token now and make it the current one.
    ///
    /// On failure the previous watcher stays in place.
    ///
    /// # Errors
    ///
    /// Returns the grant's error if the new token cannot be obtained.
    pub async fn refresh(&self) -> Result<(), TokenError> {
        tracing::debug!("Refreshing OAuth2 token");
        let source = (self.source_factory)()?;
        let watcher = spawn_watcher(source, &self.watcher_config)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "OAuth2 token refresh failed"))?;
        self.inner.store(Arc::new(SessionInner { watcher }));
        Ok(())
    }
}

async fn spawn_watcher(
    source: OAuthTokenSource,
    config: &WatcherConfig,
) -> Result<TokenWatcher, TokenError> {
    let jitter = RandomEarlyJitter::new(DurationSecs(config.jitter_max.as_secs()));
    let backoff =
        ErrorBackoffConfig::new(config.min_refresh_period, config.min_refresh_period * 30, 2);

    TokenWatcher::spawn_from_token_source(source, jitter, backoff).await
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use url::Url;

    fn test_config(server: &MockServer) -> OAuthClientConfig {
        OAuthClientConfig {
            token_endpoint: Some(Url::parse(&server.url("/token")).unwrap()),
            client_id: "admin-client".into(),
            client_secret: SecretString::new("hunter2"),
            http_config: Some(gateway_http::HttpClientConfig::for_testing()),
            jitter_max: Duration::from_millis(0),
            min_refresh_period: Duration::from_millis(100),
            ..Default::default()
        }
    }

    fn token_json(token: &str, expires_in: u64) -> String {
        format!(r#"{{"access_token":"{token}","expires_in":{expires_in},"token_type":"Bearer"}}"#)
    }

    #[test]
    fn session_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<TokenSession>();
    }

    #[tokio::test]
    async fn new_fetches_initial_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-new", 3600));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        assert_eq!(session.current().unwrap().expose(), "tok-new");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn new_rejects_invalid_config_without_io() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok", 3600));
        });

        let cfg = OAuthClientConfig {
            client_secret: SecretString::new(""),
            ..test_config(&server)
        };
        let err = TokenSession::new(cfg).await.unwrap_err();
        assert!(matches!(err, TokenError::Config(_)), "got: {err}");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn new_fails_when_grant_rejected() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(401).body(r#"{"error":"unauthorized_client"}"#);
        });

        let err = TokenSession::new(test_config(&server)).await.unwrap_err();
        assert!(
            matches!(err, TokenError::Grant { ref reason, .. } if reason.contains("401")),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn refresh_fetches_again() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-ref", 3600));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        mock.assert_calls(1);

        session.refresh().await.unwrap();
        mock.assert_calls(2);
        assert_eq!(session.bearer().await.unwrap().expose(), "tok-ref");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let server = MockServer::start();
        let mut ok = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-keep", 3600));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        ok.delete();
        let _fail = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400).body(r#"{"error":"invalid_grant"}"#);
        });

        assert!(session.refresh().await.is_err());
        assert_eq!(session.current().unwrap().expose(), "tok-keep");
    }

    #[tokio::test]
    async fn clones_share_refreshed_token() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-shared", 3600));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        let other = session.clone();
        session.refresh().await.unwrap();
        assert_eq!(other.current().unwrap().expose(), "tok-shared");
    }

    #[tokio::test]
    async fn debug_does_not_reveal_tokens() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("super-secret-tok", 3600));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        let dbg = format!("{session:?}");
        assert!(!dbg.contains("super-secret-tok"));
        assert!(!dbg.contains("hunter2"));
    }
}
