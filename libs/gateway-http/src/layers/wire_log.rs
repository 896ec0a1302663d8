use crate::error::HttpError;
use crate::response::ResponseBody;
use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use http_body_util::{BodyExt, Full};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tracing target for request/response dumps
pub const WIRE_LOG_TARGET: &str = "gateway_http::wire";

const REDACTED: &str = "[REDACTED]";

/// Tower layer that dumps every outgoing request and its response at `DEBUG`
///
/// Nothing is formatted (and response bodies are not buffered) unless
/// [`WIRE_LOG_TARGET`] is enabled at `DEBUG`. Header values marked sensitive,
/// and the credential headers, are printed as `[REDACTED]`.
#[derive(Clone, Default)]
pub struct WireLogLayer;

impl WireLogLayer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for WireLogLayer {
    type Service = WireLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        WireLogService { inner }
    }
}

#[derive(Clone)]
pub struct WireLogService<S> {
    inner: S,
}

impl<S> Service<Request<Full<Bytes>>> for WireLogService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if !tracing::enabled!(target: WIRE_LOG_TARGET, tracing::Level::DEBUG) {
            return Box::pin(inner.call(req));
        }

        let request_dump = format_request(&req);

        Box::pin(async move {
            tracing::debug!(target: WIRE_LOG_TARGET, "{request_dump}");

            let resp = inner.call(req).await?;
            let (parts, body) = resp.into_parts();
            let bytes = body.collect().await.map_err(HttpError::Transport)?.to_bytes();

            tracing::debug!(
                target: WIRE_LOG_TARGET,
                "{}",
                format_response(parts.status, &parts.headers, &bytes)
            );

            let body: ResponseBody = Full::new(bytes)
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })
                .boxed();
            Ok(Response::from_parts(parts, body))
        })
    }
}

fn is_redacted(name: &http::HeaderName, value: &http::HeaderValue) -> bool {
    value.is_sensitive()
        || name == http::header::AUTHORIZATION
        || name == http::header::PROXY_AUTHORIZATION
        || name == http::header::COOKIE
}

fn header_lines(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers.iter().map(|(name, value)| {
        let shown = if is_redacted(name, value) {
            REDACTED.into()
        } else {
            String::from_utf8_lossy(value.as_bytes())
        };
        format!("{name}: {shown}")
    })
}

/// Banner, start line, headers, a blank line, then the body text
fn dump(banner: &str, start_line: String, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let body = body.map(String::from_utf8_lossy).unwrap_or_default();
    [banner.to_owned(), start_line]
        .into_iter()
        .chain(header_lines(headers))
        .chain([String::new(), body.into_owned()])
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_request(req: &Request<Full<Bytes>>) -> String {
    // Peek at the Full<Bytes> body without consuming the request.
    let body = full_body_bytes(req.body());
    dump(
        "-----------START REQUEST-----------",
        format!("{} {}", req.method(), req.uri()),
        req.headers(),
        body.as_deref(),
    )
}

fn format_response(status: http::StatusCode, headers: &HeaderMap, body: &Bytes) -> String {
    dump(
        "-----------START RESPONSE----------",
        status.to_string(),
        headers,
        Some(body.as_ref()),
    )
}

/// Read the bytes of a `Full` body by polling a clone once.
fn full_body_bytes(body: &Full<Bytes>) -> Option<Bytes> {
    use http_body::Body;

    let mut body = body.clone();
    let waker = std::task::Waker::noop();
    let mut cx = Context::from_waker(waker);
    match Pin::new(&mut body).poll_frame(&mut cx) {
        Poll::Ready(Some(Ok(frame))) => frame.into_data().ok(),
        _ => None,
    }
}
