use crate::config::{ExponentialBackoff, RetryConfig};
use crate::error::HttpError;
use crate::response::ResponseBody;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

/// Tower layer that re-sends a request per its [`RetryConfig`]
#[derive(Clone)]
pub struct RetryLayer {
    config: RetryConfig,
}

impl RetryLayer {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service that sends a request up to `max_attempts` times
///
/// A retryable status on the last attempt is returned as `Ok`, so the
/// caller sees the real status and body. A connect error on the last
/// attempt is returned as that error.
#[derive(Clone)]
pub struct RetryService<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> Service<Request<Full<Bytes>>> for RetryService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // Consume the instance that was poll_ready'd, keep a fresh clone.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        let (parts, body_bytes) = req.into_parts();
        let http_version = parts.version;
        let extensions = parts.extensions.clone();
        let parts = std::sync::Arc::new(parts);

        Box::pin(async move {
            let method = parts.method.clone();
            let url_host = parts
                .uri
                .authority()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_owned());
            let max_attempts = config.max_attempts.max(1);

            let mut attempt = 0usize;
            loop {
                let mut req = Request::from_parts((*parts).clone(), body_bytes.clone());
                *req.version_mut() = http_version;
                *req.extensions_mut() = extensions.clone();

                let mut svc = inner.clone();
                svc.ready().await?;

                let has_attempts_left = attempt + 1 < max_attempts;

                match svc.call(req).await {
                    Ok(resp) => {
                        let status = resp.status();
                        let retryable = config.retries_status(&method, status);
                        if !retryable {
                            return Ok(resp);
                        }
                        if !has_attempts_left {
                            tracing::warn!(
                                attempts = attempt + 1,
                                status = status.as_u16(),
                                method = %method,
                                host = %url_host,
                                "Retries exhausted; returning last response"
                            );
                            return Ok(resp);
                        }

                        let backoff = calculate_backoff(&config.backoff, attempt);

                        if let Err(e) =
                            drain_response_body(resp, config.retry_response_drain_limit).await
                        {
                            tracing::debug!(
                                error = %e,
                                "Failed to drain response body before retry; connection may not be reused"
                            );
                        }

                        tracing::debug!(
                            retry = attempt + 1,
                            max_attempts,
                            status = status.as_u16(),
                            method = %method,
                            host = %url_host,
                            backoff_ms = backoff.as_millis(),
                            "Retrying request after status code"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(err @ HttpError::Connect(_))
                        if config.retry_connect_errors && has_attempts_left =>
                    {
                        let backoff = calculate_backoff(&config.backoff, attempt);
                        tracing::debug!(
                            retry = attempt + 1,
                            max_attempts,
                            error = %err,
                            method = %method,
                            host = %url_host,
                            backoff_ms = backoff.as_millis(),
                            "Retrying request after connect error"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        })
    }
}

/// Drain up to `limit` bytes of a discarded body so the connection can be reused.
async fn drain_response_body(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<(), HttpError> {
    let (_parts, body) = response.into_parts();
    let mut body = std::pin::pin!(body);
    let mut drained = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            drained += chunk.len();
            if drained >= limit {
                break;
            }
        }
    }

    Ok(())
}

/// Backoff before retry number `attempt + 1`
///
/// `initial * multiplier^attempt`, capped at `max`. Non-finite or negative
/// inputs are sanitized instead of panicking.
fn calculate_backoff(backoff: &ExponentialBackoff, attempt: usize) -> Duration {
    const MAX_BACKOFF_SECS: f64 = 86400.0;

    let attempt_i32 = i32::try_from(attempt).unwrap_or(i32::MAX);

    let multiplier = if backoff.multiplier.is_finite() && backoff.multiplier >= 0.0 {
        backoff.multiplier
    } else {
        1.0
    };

    let initial_secs = backoff.initial.as_secs_f64();
    let max_secs = backoff.max.as_secs_f64().min(MAX_BACKOFF_SECS);

    let base = initial_secs * multiplier.powi(attempt_i32);
    let clamped = if base.is_finite() {
        base.min(max_secs).max(0.0)
    } else {
        max_secs
    };
    let duration = Duration::from_secs_f64(clamped);

    let duration = if backoff.jitter {
        let jitter_factor = rand::rng().random_range(0.0..=0.25);
        duration + duration.mul_f64(jitter_factor)
    } else {
        duration
    };

    duration.min(Duration::from_secs_f64(max_secs))
}
