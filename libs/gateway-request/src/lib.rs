#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Execute one authenticated request against the API gateway
//!
//! [`run`] validates a [`RawRequest`], resolves the client secret, opens an
//! `OAuth2` [`TokenSession`](gateway_auth::TokenSession), and issues the call
//! through a retrying gateway client. Relative endpoints are joined to the
//! gateway prefix by [`EndpointResolver`].

mod endpoint;
mod error;
mod executor;
mod method;
mod request;
mod settings;

pub use endpoint::{DEFAULT_ENDPOINT_PREFIX, EndpointResolver};
pub use error::ExecutionError;
pub use executor::{ExecutionResult, RequestExecutor, parse_body, run};
pub use method::RequestMethod;
pub use request::{DEFAULT_METHOD, GatewayRequest, RawRequest};
pub use settings::{
    DEFAULT_CA_BUNDLE, DEFAULT_CLIENT_ID, DEFAULT_SECRET_NAME, DEFAULT_TOKEN_URL, GatewaySettings,
};
