use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use gateway_http::{HttpError, ResponseBody};
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use tower::{Layer, Service, ServiceExt};
use zeroize::Zeroizing;

use super::session::TokenSession;

/// Tower layer that attaches `Authorization: Bearer <token>` to outbound
/// requests.
///
/// When the downstream answers `401 Unauthorized`, the session is refreshed
/// once and the request is replayed with the new token. If that refresh
/// fails, the original `401` response is returned.
#[derive(Clone, Debug)]
pub struct BearerAuthLayer {
    session: TokenSession,
}

impl BearerAuthLayer {
    #[must_use]
    pub fn new(session: TokenSession) -> Self {
        Self { session }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            session: self.session.clone(),
        }
    }
}

/// Created by [`BearerAuthLayer`].
#[derive(Clone, Debug)]
pub struct BearerAuthService<S> {
    inner: S,
    session: TokenSession,
}

impl<S> Service<Request<Full<Bytes>>> for BearerAuthService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = Response<ResponseBody>;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // Clone-swap pattern (Tower Service contract).
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let session = self.session.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let first = authorize(&session, Request::from_parts(parts.clone(), body.clone())).await?;
            let resp = inner.call(first).await?;
            if resp.status() != StatusCode::UNAUTHORIZED {
                return Ok(resp);
            }

            tracing::debug!(uri = %parts.uri, "Received 401; refreshing token and replaying");
            if let Err(e) = session.refresh().await {
                tracing::warn!(error = %e, "Token refresh after 401 failed");
                return Ok(resp);
            }
            drop(resp);

            let replay = authorize(&session, Request::from_parts(parts, body)).await?;
            inner.ready().await?.call(replay).await
        })
    }
}

async fn authorize(
    session: &TokenSession,
    mut req: Request<Full<Bytes>>,
) -> Result<Request<Full<Bytes>>, HttpError> {
    let token = session
        .bearer()
        .await
        .map_err(|e| HttpError::Transport(Box::new(e)))?;
    let raw = Zeroizing::new(format!("Bearer {}", token.expose()));
    let mut value =
        HeaderValue::from_str(&raw).map_err(|e| HttpError::Transport(Box::new(e)))?;
    value.set_sensitive(true);
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(req)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::SecretString;
    use crate::oauth2::config::OAuthClientConfig;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
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

    fn token_json(token: &str) -> String {
        format!(r#"{{"access_token":"{token}","expires_in":3600,"token_type":"Bearer"}}"#)
    }

    /// Answers with the scripted statuses in order and records every
    /// `Authorization` header it sees.
    #[derive(Clone)]
    struct ScriptedService {
        statuses: Arc<Mutex<Vec<u16>>>,
        seen: Arc<Mutex<Vec<HeaderValue>>>,
    }

    impl ScriptedService {
        fn new(statuses: &[u16]) -> Self {
            Self {
                statuses: Arc::new(Mutex::new(statuses.iter().rev().copied().collect())),
                seen: Arc::default(),
            }
        }
    }

    impl Service<Request<Full<Bytes>>> for ScriptedService {
        type Response = Response<ResponseBody>;
        type Error = HttpError;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            if let Some(v) = req.headers().get(AUTHORIZATION) {
                self.seen.lock().unwrap().push(v.clone());
            }
            let status = self.statuses.lock().unwrap().pop().unwrap_or(200);
            Box::pin(async move {
                let body: ResponseBody = Full::new(Bytes::from_static(b"{}"))
                    .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })
                    .boxed();
                Ok(Response::builder().status(status).body(body).unwrap())
            })
        }
    }

    fn request() -> Request<Full<Bytes>> {
        Request::builder()
            .method("GET")
            .uri("https://api-gw-service-nmn.local/apis/bos/v1/sessiontemplate")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn injects_sensitive_bearer_header() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-layer"));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        let inner = ScriptedService::new(&[200]);
        let seen = inner.seen.clone();

        let resp = BearerAuthLayer::new(session)
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "Bearer tok-layer");
        assert!(seen[0].is_sensitive());
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_replays() {
        let server = MockServer::start();
        let token = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-401"));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        token.assert_calls(1);

        let inner = ScriptedService::new(&[401, 200]);
        let seen = inner.seen.clone();

        let resp = BearerAuthLayer::new(session)
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(seen.lock().unwrap().len(), 2, "original plus one replay");
        token.assert_calls(2);
    }

    #[tokio::test]
    async fn second_unauthorized_is_returned() {
        let server = MockServer::start();
        let token = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok-revoked"));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        let inner = ScriptedService::new(&[401, 401, 200]);
        let seen = inner.seen.clone();

        let resp = BearerAuthLayer::new(session)
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(seen.lock().unwrap().len(), 2);
        token.assert_calls(2);
    }

    #[tokio::test]
    async fn failed_refresh_returns_original_401() {
        let server = MockServer::start();
        let mut ok = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).body(token_json("tok"));
        });

        let session = TokenSession::new(test_config(&server)).await.unwrap();
        ok.delete();
        let _fail = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400);
        });

        let inner = ScriptedService::new(&[401]);
        let seen = inner.seen.clone();
        let resp = BearerAuthLayer::new(session)
            .layer(inner)
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
