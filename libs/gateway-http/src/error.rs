use std::time::Duration;

use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a gateway HTTP call
///
/// A response with an error status is not an `HttpError` until the caller
/// asks for one with [`HttpResponse::error_for_status`](crate::HttpResponse::error_for_status).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// The URL is not absolute or does not parse
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// `http://` without [`TransportSecurity::AllowInsecureHttp`](crate::TransportSecurity),
    /// or a scheme that is neither `http` nor `https`
    #[error("refusing '{scheme}' URL: {reason}")]
    Scheme { scheme: String, reason: &'static str },

    /// The configured user agent cannot be sent as a header
    #[error("user agent is not a valid header value: {0}")]
    UserAgent(#[source] http::header::InvalidHeaderValue),

    #[error("cannot assemble request: {0}")]
    Request(#[from] http::Error),

    #[error("cannot encode JSON body: {0}")]
    EncodeJson(#[source] serde_json::Error),

    #[error("cannot encode form body: {0}")]
    EncodeForm(#[from] serde_urlencoded::ser::Error),

    /// Trust roots could not be loaded, including a missing or empty CA bundle
    #[error("TLS setup failed: {0}")]
    Tls(#[source] Cause),

    /// No connection could be established, so nothing was sent
    #[error("connection failed: {0}")]
    Connect(#[source] Cause),

    /// The connection broke while the request or response was in flight
    #[error("transport failure: {0}")]
    Transport(#[source] Cause),

    /// A single attempt ran past the per-attempt deadline
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("response body exceeds {limit} bytes (read {read})")]
    BodyTooLarge { limit: usize, read: usize },

    #[error("server answered {0}")]
    Status(http::StatusCode),

    #[error("response is not the expected JSON: {0}")]
    DecodeJson(#[source] serde_json::Error),
}
