use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("gateway-http/", env!("CARGO_PKG_VERSION"));

/// Deadline applied to each gateway call attempt.
///
/// Backend APIs behind the gateway (boot orchestration, image builds) can take
/// minutes to answer.
pub const GATEWAY_REQUEST_TIMEOUT: Duration = Duration::from_secs(2000);

/// Default number of total attempts for a single logical call
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Default backoff factor (wait before the first retry)
pub const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_secs(2);

/// Upper bound for a single backoff sleep
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Statuses the gateway returns while a backend is restarting or overloaded
pub const GATEWAY_RETRY_STATUSES: [u16; 3] = [502, 503, 504];

/// Default drain limit for response bodies before retry (64 KiB)
pub const DEFAULT_RETRY_RESPONSE_DRAIN_LIMIT: usize = 64 * 1024;

/// Token responses are small; anything bigger is not a token.
const TOKEN_RESPONSE_LIMIT: usize = 1024 * 1024;

/// Exponential backoff between attempts
///
/// The wait before retry `n` (1-based) is `initial * multiplier^(n-1)`,
/// capped at `max`, with optional jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Wait before the first retry, a.k.a. the backoff factor (default: 2s)
    pub initial: Duration,

    /// Maximum backoff duration (default: 120s)
    pub max: Duration,

    /// Growth per attempt (default: 2.0)
    pub multiplier: f64,

    /// Add a random 0-25% on top of each backoff (default: false)
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BACKOFF_FACTOR,
            max: DEFAULT_BACKOFF_MAX,
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            ..Default::default()
        }
    }

    /// Millisecond backoff for tests against mock servers (1ms initial, 20ms max)
    #[must_use]
    pub fn fast() -> Self {
        Self::new(Duration::from_millis(1), Duration::from_millis(20))
    }
}

/// Retry policy for a single logical call
///
/// Two kinds of failure are retried, both bounded by `max_attempts`:
///
/// - a status listed in `statuses`, but only when the method is idempotent
///   (`GET`, `HEAD`, `PUT`, `DELETE`, `OPTIONS`, `TRACE`). A `POST` or
///   `PATCH` that reached the backend is never sent twice.
/// - a connection that could not be established (refused, DNS, TLS
///   handshake), for every method, when `retry_connect_errors` is set. The
///   request never left the client in that case.
///
/// Timeouts and errors on an established connection surface after the first
/// attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one (default: 10)
    pub max_attempts: usize,

    pub backoff: ExponentialBackoff,

    /// Retryable response statuses (default: 502, 503, 504)
    pub statuses: HashSet<u16>,

    /// Retry when no connection could be made (default: true)
    pub retry_connect_errors: bool,

    /// Bytes read from a discarded response before retrying, so the
    /// connection can go back to the pool (default: 64 KiB)
    pub retry_response_drain_limit: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: ExponentialBackoff::default(),
            statuses: HashSet::from(GATEWAY_RETRY_STATUSES),
            retry_connect_errors: true,
            retry_response_drain_limit: DEFAULT_RETRY_RESPONSE_DRAIN_LIMIT,
        }
    }
}

impl RetryConfig {
    /// Gateway policy with millisecond backoff, for tests against mock servers
    #[must_use]
    pub fn fast() -> Self {
        Self {
            backoff: ExponentialBackoff::fast(),
            ..Default::default()
        }
    }

    /// Whether a response with `status` to a `method` request may be re-sent
    #[must_use]
    pub fn retries_status(&self, method: &http::Method, status: http::StatusCode) -> bool {
        is_idempotent(method) && self.statuses.contains(&status.as_u16())
    }
}

fn is_idempotent(method: &http::Method) -> bool {
    use http::Method;

    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ]
    .contains(method)
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// OS native root certificate store
    Native,
    /// Only the certificates in a PEM bundle file
    CaBundle(PathBuf),
}

/// Whether plain `http://` URLs are accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// HTTPS only
    #[default]
    TlsOnly,
    /// Plain HTTP is accepted too; meant for local mock servers
    AllowInsecureHttp,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt timeout (default: 30 seconds)
    pub request_timeout: Duration,

    /// Cap on a response body read into memory; `None` reads it all (default)
    pub max_body_size: Option<usize>,

    pub user_agent: String,

    /// `None` sends every request exactly once
    pub retry: Option<RetryConfig>,

    pub transport: TransportSecurity,

    pub tls_roots: TlsRootConfig,

    /// Log request and response blocks at debug level (default: false)
    ///
    /// Output is produced only when the `gateway_http::wire` target is
    /// enabled at `DEBUG`. Sensitive headers are redacted.
    pub wire_log: bool,

    /// Idle pooled connections are closed after this long (default: 90s)
    pub pool_idle_timeout: Option<Duration>,

    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: Some(RetryConfig::default()),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            wire_log: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 8,
        }
    }
}

impl HttpClientConfig {
    /// Business calls through the API gateway
    ///
    /// Trusts only the given CA bundle, waits up to
    /// [`GATEWAY_REQUEST_TIMEOUT`] per attempt and applies the default
    /// [`RetryConfig`]. Response size is not capped.
    #[must_use]
    pub fn gateway(ca_bundle: impl Into<PathBuf>) -> Self {
        Self {
            request_timeout: GATEWAY_REQUEST_TIMEOUT,
            tls_roots: TlsRootConfig::CaBundle(ca_bundle.into()),
            ..Default::default()
        }
    }

    /// The `OAuth2` token endpoint: one unretried, unlogged request
    #[must_use]
    pub fn token_endpoint(tls_roots: TlsRootConfig, transport: TransportSecurity) -> Self {
        Self {
            max_body_size: Some(TOKEN_RESPONSE_LIMIT),
            retry: None,
            transport,
            tls_roots,
            wire_log: false,
            pool_max_idle_per_host: 1,
            ..Default::default()
        }
    }

    /// Token endpoint settings that trust the same roots as `self`
    ///
    /// Keeps TLS, transport and timeout; drops retry and wire logging.
    #[must_use]
    pub fn for_token_endpoint(&self) -> Self {
        Self {
            request_timeout: self.request_timeout,
            ..Self::token_endpoint(self.tls_roots.clone(), self.transport)
        }
    }

    /// Mock-server settings: plain HTTP allowed, millisecond retry backoff
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry: Some(RetryConfig::fast()),
            transport: TransportSecurity::AllowInsecureHttp,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            ..Default::default()
        }
    }
}
