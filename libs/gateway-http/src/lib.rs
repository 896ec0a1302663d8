#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Resilient HTTP client for calls through the API gateway
//!
//! A hyper-based client with:
//! - TLS via rustls, trusting a CA bundle, native roots or webpki roots
//! - Connection pooling and a per-attempt timeout
//! - Retry with exponential backoff on gateway statuses (502/503/504) for
//!   idempotent methods, and on refused connections for every method
//! - Transparent response decompression (gzip, brotli, deflate)
//! - Optional request/response dumps at debug level with credential redaction
//!
//! ```ignore
//! use gateway_http::{HttpClientBuilder, HttpClientConfig};
//!
//! let client = HttpClientBuilder::with_config(HttpClientConfig::gateway(
//!     "/var/opt/cray/certificate_authority/certificate_authority.crt",
//! ))
//! .build()?;
//!
//! let value: serde_json::Value = client
//!     .request(Method::GET, "https://api-gw-service-nmn.local/apis/smd/hsm/v2/State/Components")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::{HttpClient, HttpService};
pub use config::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BACKOFF_MAX, DEFAULT_MAX_ATTEMPTS, DEFAULT_USER_AGENT,
    ExponentialBackoff, GATEWAY_REQUEST_TIMEOUT, HttpClientConfig, RetryConfig, TlsRootConfig,
    TransportSecurity,
};
pub use error::HttpError;
pub use layers::WIRE_LOG_TARGET;
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
