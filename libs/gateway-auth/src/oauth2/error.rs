use thiserror::Error;

/// Why no access token could be produced
///
/// Messages name the endpoint and the failure, never the client secret, the
/// token, or a response body the endpoint may have echoed them into.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Settings rejected before any request was made
    #[error("incomplete OAuth2 client settings: {0}")]
    Config(String),

    /// The grant request did not produce a 2xx response
    #[error("token grant to {endpoint} failed: {reason}")]
    Grant { endpoint: String, reason: String },

    /// A 2xx response whose body is not a token
    #[error("token endpoint answered with an unusable body: {0}")]
    Malformed(String),

    #[error("token type '{0}' is not Bearer")]
    NotBearer(String),

    /// The cached token ran out and the background refresh has not replaced it
    #[error("access token expired: {0}")]
    Expired(String),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn grant_names_endpoint_and_reason() {
        let e = TokenError::Grant {
            endpoint: "https://api-gw-service-nmn.local/keycloak/token".into(),
            reason: "server answered 401 Unauthorized".into(),
        };
        assert_eq!(
            e.to_string(),
            "token grant to https://api-gw-service-nmn.local/keycloak/token failed: \
             server answered 401 Unauthorized"
        );
    }

    #[test]
    fn not_bearer_names_the_type() {
        assert_eq!(
            TokenError::NotBearer("mac".into()).to_string(),
            "token type 'mac' is not Bearer"
        );
    }
}
