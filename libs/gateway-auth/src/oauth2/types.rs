use serde::Deserialize;

/// Deserialized `OAuth2` token endpoint response.
///
/// `Deserialize` only, so an access token cannot be serialized back out
/// into logs or error messages. Unknown fields are ignored.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds; optional per RFC 6749.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Must be `Bearer` (any case) when present.
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn deserialize_keycloak_response() {
        let json = r#"{
            "access_token":"eyJ.tok",
            "expires_in":300,
            "refresh_expires_in":0,
            "token_type":"Bearer",
            "not-before-policy":0,
            "scope":"profile email"
        }"#;
        let r: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.access_token, "eyJ.tok");
        assert_eq!(r.expires_in, Some(300));
        assert_eq!(r.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn deserialize_minimal_response() {
        let r: TokenResponse = serde_json::from_str(r#"{"access_token":"tok"}"#).unwrap();
        assert_eq!(r.access_token, "tok");
        assert!(r.expires_in.is_none());
        assert!(r.token_type.is_none());
    }

    #[test]
    fn missing_access_token_fails() {
        assert!(serde_json::from_str::<TokenResponse>(r#"{"expires_in":300}"#).is_err());
    }
}
