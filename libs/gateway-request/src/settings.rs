use gateway_auth::SecretString;
use gateway_http::HttpClientConfig;

use crate::endpoint::DEFAULT_ENDPOINT_PREFIX;

pub const DEFAULT_TOKEN_URL: &str =
    "https://api-gw-service-nmn.local/keycloak/realms/shasta/protocol/openid-connect/token";
pub const DEFAULT_CLIENT_ID: &str = "admin-client";
pub const DEFAULT_SECRET_NAME: &str = "admin-client-auth";
pub const DEFAULT_CA_BUNDLE: &str = "/var/opt/cray/certificate_authority/certificate_authority.crt";

/// Everything [`RequestExecutor::connect`](crate::RequestExecutor::connect)
/// needs besides the secret store.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub token_url: String,
    pub client_id: String,
    /// Used as is when non-empty; otherwise looked up by
    /// [`client_secret_name`](Self::client_secret_name).
    pub client_secret: Option<SecretString>,
    pub client_secret_name: String,
    pub endpoint_prefix: String,
    /// Business calls use this as is; the token grant derives its config
    /// via [`HttpClientConfig::for_token_endpoint`].
    pub http: HttpClientConfig,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            client_secret: None,
            client_secret_name: DEFAULT_SECRET_NAME.to_owned(),
            endpoint_prefix: DEFAULT_ENDPOINT_PREFIX.to_owned(),
            http: HttpClientConfig::gateway(DEFAULT_CA_BUNDLE),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use gateway_http::TlsRootConfig;

    #[test]
    fn defaults_target_the_gateway() {
        let s = GatewaySettings::default();
        assert_eq!(s.client_id, "admin-client");
        assert_eq!(s.client_secret_name, "admin-client-auth");
        assert!(s.client_secret.is_none());
        assert!(s.token_url.ends_with("/openid-connect/token"));
        assert_eq!(s.endpoint_prefix, "https://api-gw-service-nmn.local/apis/");
        assert_eq!(
            s.http.tls_roots,
            TlsRootConfig::CaBundle(DEFAULT_CA_BUNDLE.into())
        );
        assert_eq!(s.http.request_timeout, gateway_http::GATEWAY_REQUEST_TIMEOUT);
    }

    #[test]
    fn debug_redacts_secret() {
        let s = GatewaySettings {
            client_secret: Some(SecretString::new("hunter2")),
            ..Default::default()
        };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
