#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Credentials for calls through the API gateway
//!
//! - [`secret`]: resolve the `OAuth2` client secret from caller input or a
//!   [`SecretStore`](secret::SecretStore) such as `kubectl`.
//! - [`oauth2`]: a client-credentials [`TokenSession`] and the tower layer
//!   that attaches its bearer token to outbound requests.

pub mod oauth2;
pub mod secret;
mod secret_string;

pub use oauth2::{
    BearerAuthLayer, HttpClientBuilderExt, OAuthClientConfig, TokenError, TokenSession,
};
pub use secret::{KubectlSecretStore, SecretError, SecretStore};
pub use secret_string::SecretString;
