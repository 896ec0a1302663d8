use crate::client::{HttpClient, HttpService};
use crate::config::{HttpClientConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{RetryLayer, WireLogLayer};
use crate::response::ResponseBody;
use crate::tls;
use bytes::Bytes;
use http::Response;
use http::header::HeaderValue;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tower::ServiceBuilder;
use tower::{Layer, ServiceExt};
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneSyncService;
use tower_http::decompression::DecompressionLayer;

type AuthWrap = Box<dyn FnOnce(HttpService) -> HttpService + Send>;

/// Assembles an [`HttpClient`] from an [`HttpClientConfig`]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    auth_layer: Option<AuthWrap>,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            auth_layer: None,
        }
    }

    /// Wrap the stack below retry with an auth layer
    ///
    /// Stack position: `Retry → **this layer** → WireLog → Timeout → …`, so
    /// every attempt reads the current credentials. A second call replaces
    /// the first.
    #[must_use]
    pub fn with_auth_layer(
        mut self,
        wrap: impl FnOnce(HttpService) -> HttpService + Send + 'static,
    ) -> Self {
        self.auth_layer = Some(Box::new(wrap));
        self
    }

    /// Build the client and its connection pool
    ///
    /// # Errors
    ///
    /// `HttpError::Tls` if the trust roots cannot be loaded, including an
    /// unusable CA bundle; `HttpError::UserAgent` for an unsendable user agent.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let Self {
            config,
            auth_layer,
        } = self;

        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!("plain HTTP allowed; traffic to http:// URLs is not encrypted");
        }

        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(HttpError::UserAgent)?;
        let timeout = config.request_timeout;

        let mut pool = Client::builder(TokioExecutor::new());
        // pool_idle_timeout needs a timer to fire
        pool.pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(idle) = config.pool_idle_timeout {
            pool.pool_idle_timeout(idle);
        }
        let hyper_client =
            pool.build::<_, Full<Bytes>>(https_connector(&config.tls_roots, config.transport)?);

        // Outer to inner:
        //   Retry → [Auth] → WireLog → error mapping → Timeout → Decompression → hyper
        let base = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(box_body)
            .map_err(move |e: tower::BoxError| classify_error(e, timeout));
        let mut service: HttpService = BoxCloneSyncService::new(base);

        if config.wire_log {
            service = BoxCloneSyncService::new(WireLogLayer::new().layer(service));
        }
        if let Some(wrap) = auth_layer {
            service = wrap(service);
        }
        if let Some(retry) = config.retry {
            service = BoxCloneSyncService::new(RetryLayer::new(retry).layer(service));
        }

        Ok(HttpClient {
            service,
            body_limit: config.max_body_size,
            user_agent,
            transport: config.transport,
        })
    }
}

/// Sort a failed attempt into timeout, connect or transport
fn classify_error(err: tower::BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }
    let err = match err.downcast::<HttpError>() {
        Ok(err) => return *err,
        Err(err) => err,
    };
    match err.downcast::<hyper_util::client::legacy::Error>() {
        Ok(err) if err.is_connect() => HttpError::Connect(err),
        Ok(err) => HttpError::Transport(err),
        Err(err) => HttpError::Transport(err),
    }
}

fn box_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}

/// HTTPS connector for `roots`; ALPN offers h2 and http/1.1
fn https_connector(
    roots: &TlsRootConfig,
    transport: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let builder = match roots {
        TlsRootConfig::WebPki => HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::get_crypto_provider())
            .map_err(|e| HttpError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => {
            let config = tls::native_roots_client_config().map_err(|e| HttpError::Tls(e.into()))?;
            HttpsConnectorBuilder::new().with_tls_config(config)
        }
        TlsRootConfig::CaBundle(path) => {
            let config = tls::ca_bundle_client_config(path).map_err(|e| HttpError::Tls(e.into()))?;
            HttpsConnectorBuilder::new().with_tls_config(config)
        }
    };

    let connector = match transport {
        TransportSecurity::AllowInsecureHttp => builder.https_or_http(),
        TransportSecurity::TlsOnly => builder.https_only(),
    };
    Ok(connector.enable_all_versions().build())
}
