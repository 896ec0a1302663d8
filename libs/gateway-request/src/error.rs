use gateway_auth::{SecretError, TokenError};
use thiserror::Error;

/// Why a gateway request could not be completed.
///
/// None of the messages carry the client secret or the access token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The client secret could not be obtained.
    #[error("client secret unavailable: {0}")]
    SecretUnavailable(#[from] SecretError),

    /// Incomplete `OAuth2` configuration or a failed token grant.
    #[error("authentication failed: {0}")]
    Authentication(#[from] TokenError),

    #[error("unsupported method '{0}': expected one of get, post, patch, delete")]
    UnsupportedMethod(String),

    /// Error status (after retries) or transport failure.
    ///
    /// `body` holds the response text when the server answered.
    #[error("request failed: {reason}")]
    RequestFailed {
        status: Option<http::StatusCode>,
        reason: String,
        body: Option<String>,
    },
}

impl ExecutionError {
    pub(crate) fn from_status(status: http::StatusCode, body: String) -> Self {
        Self::RequestFailed {
            status: Some(status),
            reason: format!("HTTP {status}"),
            body: Some(body),
        }
    }

    pub(crate) fn from_transport(err: &gateway_http::HttpError) -> Self {
        Self::RequestFailed {
            status: None,
            reason: err.to_string(),
            body: None,
        }
    }

    /// Response text carried by a [`RequestFailed`](Self::RequestFailed),
    /// if the server answered with a non-empty body.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::RequestFailed {
                body: Some(body), ..
            } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}
