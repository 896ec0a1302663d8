use crate::client::HttpService;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::response::HttpResponse;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::Full;
use serde::Serialize;
use tower::{Service, ServiceExt};

/// Encoded request body and the media type announcing it
struct Payload {
    content_type: &'static str,
    bytes: Bytes,
}

/// One pending request, sent with [`send`](Self::send)
///
/// ```ignore
/// let resp = client
///     .request(Method::PATCH, "https://api-gw-service-nmn.local/apis/bss/boot/v1/bootparameters")
///     .json(&serde_json::json!({"hosts": ["x3000c0s1b0n0"]}))?
///     .send()
///     .await?;
/// ```
#[must_use = "nothing is sent until .send() is awaited"]
pub struct RequestBuilder {
    service: HttpService,
    body_limit: Option<usize>,
    user_agent: HeaderValue,
    transport: TransportSecurity,
    method: Method,
    url: String,
    payload: Option<Payload>,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: HttpService,
        body_limit: Option<usize>,
        user_agent: HeaderValue,
        transport: TransportSecurity,
        method: Method,
        url: String,
    ) -> Self {
        Self {
            service,
            body_limit,
            user_agent,
            transport,
            method,
            url,
            payload: None,
        }
    }

    /// Send `body` as `application/json`
    ///
    /// # Errors
    ///
    /// `HttpError::EncodeJson` if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        let bytes = serde_json::to_vec(body).map_err(HttpError::EncodeJson)?;
        self.payload = Some(Payload {
            content_type: "application/json",
            bytes: bytes.into(),
        });
        Ok(self)
    }

    /// Send `fields` as `application/x-www-form-urlencoded`
    ///
    /// # Errors
    ///
    /// `HttpError::EncodeForm` if the fields cannot be encoded.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Result<Self, HttpError> {
        let encoded = serde_urlencoded::to_string(fields)?;
        self.payload = Some(Payload {
            content_type: "application/x-www-form-urlencoded",
            bytes: encoded.into(),
        });
        Ok(self)
    }

    /// Send the request through the client's layer stack
    ///
    /// Any status comes back as `Ok`; only failures to get a response are
    /// errors.
    ///
    /// # Errors
    ///
    /// - `HttpError::InvalidUrl` or `HttpError::Scheme` before anything is sent
    /// - `HttpError::Connect`, `Transport` or `Timeout` from the last attempt
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        let uri = checked_uri(&self.url, self.transport)?;

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .header(USER_AGENT, self.user_agent);
        let body = match self.payload {
            Some(payload) => {
                request = request.header(CONTENT_TYPE, payload.content_type);
                payload.bytes
            }
            None => Bytes::new(),
        };
        let request = request.body(Full::new(body))?;

        let mut service = self.service;
        let inner = service.ready().await?.call(request).await?;

        Ok(HttpResponse {
            inner,
            body_limit: self.body_limit,
        })
    }
}

/// Parse `url` and check it is absolute and allowed by `transport`
fn checked_uri(url: &str, transport: TransportSecurity) -> Result<Uri, HttpError> {
    let invalid = |reason: String| HttpError::InvalidUrl {
        url: url.to_owned(),
        reason,
    };

    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
    let Some(scheme) = uri.scheme_str() else {
        return Err(invalid("no scheme".to_owned()));
    };
    if uri.authority().is_none() {
        return Err(invalid("no host".to_owned()));
    }

    match (scheme, transport) {
        ("https", _) | ("http", TransportSecurity::AllowInsecureHttp) => Ok(uri),
        ("http", _) => Err(HttpError::Scheme {
            scheme: scheme.to_owned(),
            reason: "plain HTTP is disabled",
        }),
        _ => Err(HttpError::Scheme {
            scheme: scheme.to_owned(),
            reason: "only http and https are supported",
        }),
    }
}
