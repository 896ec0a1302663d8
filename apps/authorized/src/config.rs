use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use gateway_auth::{KubectlSecretStore, SecretString};
use gateway_http::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BACKOFF_MAX, DEFAULT_MAX_ATTEMPTS, ExponentialBackoff,
    GATEWAY_REQUEST_TIMEOUT, HttpClientConfig, RetryConfig, TlsRootConfig,
};
use gateway_request::{
    DEFAULT_CA_BUNDLE, DEFAULT_CLIENT_ID, DEFAULT_ENDPOINT_PREFIX, DEFAULT_SECRET_NAME,
    DEFAULT_TOKEN_URL, GatewaySettings,
};
use serde::{Deserialize, Serialize};

use crate::cli::CliOverrides;

/// Environment prefix; `__` separates nested keys (`AUTHORIZED__HTTP__WIRE_LOG`).
pub const ENV_PREFIX: &str = "AUTHORIZED__";

/// Resolved application configuration.
///
/// Layers, lowest first: built-in defaults, the YAML file, `AUTHORIZED__*`
/// environment variables, command-line flags. The client secret is never
/// read from here; it comes from the command line or the secret store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub token_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret_name: String,
    /// CA bundle path; empty selects the OS trust store.
    pub certificate: String,
    pub endpoint_prefix: String,
    pub secret_store: SecretStoreConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            oauth_client_id: DEFAULT_CLIENT_ID.to_owned(),
            oauth_client_secret_name: DEFAULT_SECRET_NAME.to_owned(),
            certificate: DEFAULT_CA_BUNDLE.to_owned(),
            endpoint_prefix: DEFAULT_ENDPOINT_PREFIX.to_owned(),
            secret_store: SecretStoreConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `kubectl` invocation used to look up the client secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretStoreConfig {
    pub program: String,
    pub namespace: Option<String>,
    pub field: String,
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            program: "kubectl".to_owned(),
            namespace: None,
            field: gateway_auth::secret::DEFAULT_SECRET_FIELD.to_owned(),
        }
    }
}

impl SecretStoreConfig {
    #[must_use]
    pub fn build(&self) -> KubectlSecretStore {
        let store = KubectlSecretStore::new()
            .with_program(self.program.clone())
            .with_field(self.field.clone());
        match &self.namespace {
            Some(ns) => store.with_namespace(ns.clone()),
            None => store,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub max_attempts: usize,
    pub backoff_factor_ms: u64,
    pub backoff_max_ms: u64,
    /// Cap on a gateway response body in bytes; unset reads any size.
    pub max_body_size: Option<usize>,
    /// Dump requests and responses at debug level; also enabled by `-vv`.
    pub wire_log: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: GATEWAY_REQUEST_TIMEOUT.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor_ms: duration_millis(DEFAULT_BACKOFF_FACTOR),
            backoff_max_ms: duration_millis(DEFAULT_BACKOFF_MAX),
            max_body_size: None,
            wire_log: false,
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter used when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// # Errors
    /// Returns an error if `file` does not exist or any layer fails to parse.
    pub fn load(file: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        Self::figment(file, overrides)?
            .extract()
            .context("invalid configuration")
    }

    fn figment(file: Option<&Path>, overrides: &CliOverrides) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides)))
    }

    /// Settings for the request executor.
    ///
    /// `cli_secret`, when non-empty, is used instead of a store lookup.
    /// `verbose >= 2` turns on wire logging.
    #[must_use]
    pub fn gateway_settings(&self, cli_secret: &str, verbose: u8) -> GatewaySettings {
        let mut http = if self.certificate.trim().is_empty() {
            HttpClientConfig {
                tls_roots: TlsRootConfig::Native,
                ..HttpClientConfig::default()
            }
        } else {
            HttpClientConfig::gateway(self.certificate.clone())
        };
        http.request_timeout = Duration::from_secs(self.http.request_timeout_secs);
        http.retry = Some(RetryConfig {
            max_attempts: self.http.max_attempts,
            backoff: ExponentialBackoff::new(
                Duration::from_millis(self.http.backoff_factor_ms),
                Duration::from_millis(self.http.backoff_max_ms),
            ),
            ..RetryConfig::default()
        });
        http.max_body_size = self.http.max_body_size;
        http.wire_log = self.http.wire_log || verbose >= 2;

        GatewaySettings {
            token_url: self.token_url.clone(),
            client_id: self.oauth_client_id.clone(),
            client_secret: (!cli_secret.is_empty()).then(|| SecretString::new(cli_secret)),
            client_secret_name: self.oauth_client_secret_name.clone(),
            endpoint_prefix: self.endpoint_prefix.clone(),
            http,
        }
    }
}
