use std::fmt;

use gateway_auth::secret::{self, SecretStore};
use gateway_auth::{HttpClientBuilderExt, OAuthClientConfig, TokenError, TokenSession};
use gateway_http::{HttpClient, HttpClientBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::endpoint::EndpointResolver;
use crate::error::ExecutionError;
use crate::request::{GatewayRequest, RawRequest};
use crate::settings::GatewaySettings;

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// `false` only for `GET`.
    pub changed: bool,
    /// Parsed response body; see [`parse_body`].
    pub response: Value,
}

/// Authenticated, retrying executor for gateway requests.
///
/// Holds one [`TokenSession`] and the gateway client that carries its bearer
/// token. Build it with [`connect`](Self::connect).
#[derive(Clone)]
pub struct RequestExecutor {
    client: HttpClient,
    session: TokenSession,
    endpoints: EndpointResolver,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Resolve the client secret, open the token session and build the
    /// gateway client.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::SecretUnavailable`] if no usable secret is found.
    /// - [`ExecutionError::Authentication`] for an incomplete configuration
    ///   or a failed token grant.
    /// - [`ExecutionError::RequestFailed`] if the gateway client cannot be
    ///   built.
    pub async fn connect(
        settings: &GatewaySettings,
        store: &dyn SecretStore,
    ) -> Result<Self, ExecutionError> {
        let client_secret = secret::resolve(
            settings.client_secret.as_ref(),
            &settings.client_secret_name,
            store,
        )
        .await?;

        let token_endpoint = parse_token_url(&settings.token_url)?;
        let session = TokenSession::new(OAuthClientConfig {
            token_endpoint,
            client_id: settings.client_id.clone(),
            client_secret,
            http_config: Some(settings.http.for_token_endpoint()),
            ..Default::default()
        })
        .await?;

        let client = HttpClientBuilder::with_config(settings.http.clone())
            .with_bearer_auth(session.clone())
            .build()
            .map_err(|e| ExecutionError::from_transport(&e))?;

        Ok(Self {
            client,
            session,
            endpoints: EndpointResolver::new(settings.endpoint_prefix.clone()),
        })
    }

    /// Issue `req` through the gateway.
    ///
    /// The token is refreshed right before the call. Statuses 502/503/504 are
    /// retried by the client; any other non-2xx status, or retries running
    /// out, is a [`ExecutionError::RequestFailed`] carrying the body text.
    ///
    /// # Errors
    ///
    /// See [`ExecutionError`].
    pub async fn execute(&self, req: &GatewayRequest) -> Result<ExecutionResult, ExecutionError> {
        let url = self.endpoints.resolve(&req.endpoint);
        tracing::info!("Endpoint: {url}");
        tracing::info!("Method: {}", req.method);
        tracing::info!("Body: {}", req.body);

        self.session.refresh().await?;

        let response = self
            .client
            .request(req.method.as_http(), &url)
            .json(&req.body)
            .map_err(|e| ExecutionError::from_transport(&e))?
            .send()
            .await
            .map_err(|e| ExecutionError::from_transport(&e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExecutionError::from_transport(&e))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::debug!(status = status.as_u16(), "Gateway returned error status");
            return Err(ExecutionError::from_status(status, body));
        }

        Ok(ExecutionResult {
            changed: req.method.changes_state(),
            response: parse_body(&bytes),
        })
    }
}

/// Validate `raw`, connect and execute.
///
/// The method is checked first, so an unsupported verb fails before the
/// secret store or any endpoint is contacted.
///
/// # Errors
///
/// See [`ExecutionError`].
pub async fn run(
    settings: &GatewaySettings,
    raw: RawRequest,
    store: &dyn SecretStore,
) -> Result<ExecutionResult, ExecutionError> {
    let req = GatewayRequest::parse(raw)?;
    let executor = RequestExecutor::connect(settings, store).await?;
    executor.execute(&req).await
}

/// Interpret a success body.
///
/// JSON is returned as parsed. A zero-length body becomes `{}`; anything
/// else, whitespace included, is wrapped as `{"text": <raw>}`.
#[must_use]
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        let mut map = Map::new();
        map.insert(
            "text".to_owned(),
            Value::String(String::from_utf8_lossy(bytes).into_owned()),
        );
        Value::Object(map)
    })
}

fn parse_token_url(raw: &str) -> Result<Option<Url>, TokenError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Url::parse(raw)
        .map(Some)
        .map_err(|e| TokenError::Config(format!("invalid token URL '{raw}': {e}")))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_auth::{SecretError, SecretString};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    struct CountingStore(AtomicUsize);

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn fetch(&self, name: &str) -> Result<String, SecretError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(SecretError::Lookup {
                name: name.to_owned(),
                reason: "unreachable".into(),
            })
        }
    }

    #[test]
    fn parse_body_json_object() {
        assert_eq!(parse_body(br#"{"a":1}"#), json!({"a": 1}));
    }

    #[test]
    fn parse_body_json_array() {
        assert_eq!(parse_body(b"[1,2]"), json!([1, 2]));
    }

    #[test]
    fn parse_body_empty() {
        assert_eq!(parse_body(b""), json!({}));
    }

    #[test]
    fn parse_body_whitespace_is_text() {
        assert_eq!(parse_body(b" \n"), json!({"text": " \n"}));
        assert_eq!(parse_body(b"\n"), json!({"text": "\n"}));
    }

    #[test]
    fn parse_body_plain_text() {
        assert_eq!(parse_body(b"ok"), json!({"text": "ok"}));
    }

    #[test]
    fn token_url_parsing() {
        assert_eq!(parse_token_url("  ").unwrap(), None);
        assert!(parse_token_url("https://x.local/token").unwrap().is_some());
        let err = parse_token_url("not a url").unwrap_err();
        assert!(matches!(err, TokenError::Config(ref m) if m.contains("not a url")));
    }

    #[tokio::test]
    async fn unsupported_method_fails_before_any_io() {
        let store = CountingStore(AtomicUsize::new(0));
        let raw = RawRequest {
            method: "put".into(),
            ..RawRequest::new("bos/v1/session")
        };

        let err = run(&GatewaySettings::default(), raw, &store)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::UnsupportedMethod(ref m) if m == "put"));
        assert_eq!(store.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_token_url_is_authentication_error() {
        let store = CountingStore(AtomicUsize::new(0));
        let settings = GatewaySettings {
            token_url: String::new(),
            client_secret: Some(SecretString::new("hunter2")),
            ..Default::default()
        };

        let err = RequestExecutor::connect(&settings, &store).await.unwrap_err();
        assert!(
            matches!(err, ExecutionError::Authentication(TokenError::Config(_))),
            "got: {err}"
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_request_without_credentials() {
        let server = MockServer::start();
        let _token = server.mock(|when, then| {
            when.method(POST).path("/keycloak/token");
            then.status(200)
                .body(r#"{"access_token":"tok-do-not-log","expires_in":300,"token_type":"Bearer"}"#);
        });
        let _api = server.mock(|when, then| {
            when.method(PATCH).path("/apis/bss/boot/v1/bootparameters");
            then.status(200).body(r#"{"updated":true}"#);
        });

        let settings = GatewaySettings {
            token_url: server.url("/keycloak/token"),
            client_secret: Some(SecretString::new("secret-do-not-log")),
            endpoint_prefix: server.url("/apis/"),
            http: gateway_http::HttpClientConfig::for_testing(),
            ..Default::default()
        };
        let store = CountingStore(AtomicUsize::new(0));
        let raw = RawRequest {
            endpoint: "bss/boot/v1/bootparameters".into(),
            method: "patch".into(),
            body: json!({"hosts": ["x3000c0s1b0n0"]}),
        };

        let result = run(&settings, raw, &store).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.response, json!({"updated": true}));

        assert!(logs_contain("Endpoint: "));
        assert!(logs_contain("/apis/bss/boot/v1/bootparameters"));
        assert!(logs_contain("Method: PATCH"));
        assert!(logs_contain("x3000c0s1b0n0"));
        assert!(!logs_contain("secret-do-not-log"));
        assert!(!logs_contain("tok-do-not-log"));
    }
}
