use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use crate::response::ResponseBody;
use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, Request, Response};
use http_body_util::Full;
use tower::util::BoxCloneSyncService;

/// Type-erased layer stack behind an [`HttpClient`]
pub type HttpService = BoxCloneSyncService<Request<Full<Bytes>>, Response<ResponseBody>, HttpError>;

/// Gateway HTTP client, built by [`HttpClientBuilder`](crate::HttpClientBuilder)
///
/// Clones share the connection pool and the auth layer, if any.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: HttpService,
    pub(crate) body_limit: Option<usize>,
    pub(crate) user_agent: HeaderValue,
    pub(crate) transport: TransportSecurity,
}

impl HttpClient {
    /// Start a `method` request to the absolute `url`
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.body_limit,
            self.user_agent.clone(),
            self.transport,
            method,
            url.to_owned(),
        )
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }
}
