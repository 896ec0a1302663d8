use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExecutionError;
use crate::method::RequestMethod;

/// Default verb when the caller does not name one.
pub const DEFAULT_METHOD: &str = "get";

/// Request as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub endpoint: String,
    pub method: String,
    pub body: Value,
}

impl RawRequest {
    /// A `GET` of `endpoint` with an empty JSON object body.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: DEFAULT_METHOD.to_owned(),
            body: Value::Object(serde_json::Map::new()),
        }
    }
}

/// Validated request; the method is one the executor supports.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub endpoint: String,
    pub method: RequestMethod,
    pub body: Value,
}

impl GatewayRequest {
    /// # Errors
    /// Returns [`ExecutionError::UnsupportedMethod`] for verbs other than
    /// get, post, patch and delete.
    pub fn parse(raw: RawRequest) -> Result<Self, ExecutionError> {
        let method = raw.method.parse()?;
        Ok(Self {
            endpoint: raw.endpoint,
            method,
            body: raw.body,
        })
    }
}

impl TryFrom<RawRequest> for GatewayRequest {
    type Error = ExecutionError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}
