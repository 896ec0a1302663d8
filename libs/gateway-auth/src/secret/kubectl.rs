use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{SecretError, SecretStore};

/// Data key read from the Kubernetes secret.
pub const DEFAULT_SECRET_FIELD: &str = "client-secret";

/// [`SecretStore`] backed by `kubectl get secrets`.
///
/// Runs `kubectl get secrets <name> [-n <namespace>] -o jsonpath={.data.<field>}`
/// and returns its stdout, which is the base64-encoded value.
#[derive(Debug, Clone)]
pub struct KubectlSecretStore {
    program: String,
    namespace: Option<String>,
    field: String,
}

impl Default for KubectlSecretStore {
    fn default() -> Self {
        Self {
            program: "kubectl".to_owned(),
            namespace: None,
            field: DEFAULT_SECRET_FIELD.to_owned(),
        }
    }
}

impl KubectlSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the executable (path or name on `PATH`).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    fn command(&self, name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("get").arg("secrets").arg(name);
        if let Some(ns) = &self.namespace {
            cmd.arg("-n").arg(ns);
        }
        cmd.arg("-o")
            .arg(format!("jsonpath={{.data.{}}}", self.field))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Strip whitespace and quote characters kubectl may leave around the value.
fn parse_output(stdout: &str) -> &str {
    stdout.trim().trim_matches(|c| c == '\'' || c == '"').trim()
}

#[async_trait]
impl SecretStore for KubectlSecretStore {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        tracing::debug!(secret = name, program = %self.program, "Looking up client secret");

        let output = self
            .command(name)
            .output()
            .await
            .map_err(|e| SecretError::lookup(name, format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::lookup(
                name,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| SecretError::lookup(name, "output is not valid UTF-8"))?;
        Ok(parse_output(&stdout).to_owned())
    }
}
