use tower::ServiceBuilder;
use tower::util::BoxCloneSyncService;

use super::layer::BearerAuthLayer;
use super::session::TokenSession;

/// Extension trait for adding bearer auth to [`gateway_http::HttpClientBuilder`].
///
/// ```ignore
/// use gateway_auth::{HttpClientBuilderExt, TokenSession};
///
/// let session = TokenSession::new(config).await?;
/// let client = HttpClientBuilder::with_config(HttpClientConfig::gateway(ca))
///     .with_bearer_auth(session)
///     .build()?;
/// ```
pub trait HttpClientBuilderExt {
    /// Add `Authorization: Bearer <token>` injection, with one
    /// refresh-and-replay on `401`.
    #[must_use]
    fn with_bearer_auth(self, session: TokenSession) -> Self;
}

impl HttpClientBuilderExt for gateway_http::HttpClientBuilder {
    fn with_bearer_auth(self, session: TokenSession) -> Self {
        let layer = BearerAuthLayer::new(session);
        self.with_auth_layer(move |svc| {
            BoxCloneSyncService::new(ServiceBuilder::new().layer(layer).service(svc))
        })
    }
}
