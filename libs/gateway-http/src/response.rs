use crate::error::HttpError;
use bytes::{Bytes, BytesMut};
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// Boxed, already decompressed response body
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// A response of any status
///
/// Reading the body ignores the status. Call
/// [`error_for_status`](Self::error_for_status) first to reject non-2xx.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) body_limit: Option<usize>,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Turn a non-2xx status into [`HttpError::Status`]; the body is dropped unread
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Status` for any status outside 200-299.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        let status = self.status();
        if status.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status(status))
        }
    }

    /// Read the whole body
    ///
    /// # Errors
    ///
    /// `HttpError::BodyTooLarge` past the client's body limit, if one is
    /// set; `HttpError::Transport` if the stream breaks.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        collect_body(self.inner, self.body_limit).await
    }

    /// Read the body and decode it as JSON
    ///
    /// # Errors
    ///
    /// As [`bytes`](Self::bytes), plus `HttpError::DecodeJson`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let body = self.bytes().await?;
        serde_json::from_slice(&body).map_err(HttpError::DecodeJson)
    }
}

async fn collect_body(
    response: Response<ResponseBody>,
    limit: Option<usize>,
) -> Result<Bytes, HttpError> {
    let mut body = std::pin::pin!(response.into_body());
    let mut collected = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        let Some(chunk) = frame.data_ref() else {
            continue;
        };
        let read = collected.len() + chunk.len();
        if let Some(limit) = limit
            && read > limit
        {
            return Err(HttpError::BodyTooLarge { limit, read });
        }
        collected.extend_from_slice(chunk);
    }

    Ok(collected.freeze())
}
