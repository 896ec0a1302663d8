use std::path::PathBuf;

use clap::Parser;
use gateway_request::{DEFAULT_METHOD, RawRequest};
use serde::Serialize;

/// Run one OAuth2-authenticated request against the API gateway
///
/// The result is printed to stdout as JSON; logs go to stderr.
#[derive(Parser)]
#[command(name = "authorized", version, about, long_about = None)]
pub struct Cli {
    /// OAuth2 token endpoint [default: gateway Keycloak token URL]
    #[arg(long)]
    pub token_url: Option<String>,

    /// OAuth2 client id [default: admin-client]
    #[arg(long)]
    pub oauth_client_id: Option<String>,

    /// OAuth2 client secret; when empty it is read from the secret store
    #[arg(long, default_value = "", hide_default_value = true)]
    pub oauth_client_secret: String,

    /// Name of the secret holding the client secret [default: admin-client-auth]
    #[arg(long)]
    pub oauth_client_secret_name: Option<String>,

    /// CA bundle to trust; an empty value uses the OS trust store
    /// [default: /var/opt/cray/certificate_authority/certificate_authority.crt]
    #[arg(long)]
    pub certificate: Option<String>,

    /// HTTP method: get, post, patch or delete
    #[arg(long, default_value = DEFAULT_METHOD)]
    pub method: String,

    /// Relative path under the gateway prefix, or an absolute URL
    #[arg(long)]
    pub endpoint: String,

    /// JSON request body
    #[arg(long, default_value = "{}")]
    pub body: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug with wire logging, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Flags that override configuration values, when given.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_client_secret_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingOverrides>,
}

#[derive(Debug, Default, Serialize)]
pub struct LoggingOverrides {
    pub file: PathBuf,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            token_url: self.token_url.clone(),
            oauth_client_id: self.oauth_client_id.clone(),
            oauth_client_secret_name: self.oauth_client_secret_name.clone(),
            certificate: self.certificate.clone(),
            logging: self
                .log_file
                .clone()
                .map(|file| LoggingOverrides { file }),
        }
    }

    /// The request described by `--endpoint`, `--method` and `--body`.
    ///
    /// # Errors
    /// Returns an error if `--body` is not valid JSON.
    pub fn raw_request(&self) -> anyhow::Result<RawRequest> {
        let body = serde_json::from_str(&self.body)
            .map_err(|e| anyhow::anyhow!("--body is not valid JSON: {e}"))?;
        Ok(RawRequest {
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
            body,
        })
    }
}
