//! Outbound `OAuth2` client credentials flow.
//!
//! Token acquisition, background refresh, and bearer injection (with a
//! single refresh-and-replay on `401`) for calls through the API gateway.

pub mod builder_ext;
pub mod config;
pub mod error;
pub mod layer;
pub(crate) mod source;
pub mod session;
pub(crate) mod types;

pub use builder_ext::HttpClientBuilderExt;
pub use config::OAuthClientConfig;
pub use error::TokenError;
pub use layer::{BearerAuthLayer, BearerAuthService};
pub use session::TokenSession;
