use async_trait::async_trait;

use super::SecretError;

/// Source of encoded client secrets, keyed by secret name.
///
/// Implementations return the raw stored value (base64 text); decoding is
/// done by [`resolve`](super::resolve).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the encoded value stored under `name`.
    ///
    /// # Errors
    /// Returns [`SecretError::Lookup`] if the store cannot be queried.
    async fn fetch(&self, name: &str) -> Result<String, SecretError>;
}
