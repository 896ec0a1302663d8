//! Client secret resolution
//!
//! An explicitly supplied secret wins. Otherwise the base64-encoded value is
//! fetched from a [`SecretStore`] by name and decoded.

mod error;
mod kubectl;
mod resolver;
mod store;

pub use error::SecretError;
pub use kubectl::{DEFAULT_SECRET_FIELD, KubectlSecretStore};
pub use resolver::resolve;
pub use store::SecretStore;
