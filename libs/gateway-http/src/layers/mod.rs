//! Tower layers for the gateway HTTP client
//!
//! - [`RetryLayer`] re-sends on gateway statuses and refused connections
//! - [`WireLogLayer`] dumps requests and responses at debug level

mod retry;
mod wire_log;

pub use retry::RetryLayer;
pub use wire_log::{WIRE_LOG_TARGET, WireLogLayer};
