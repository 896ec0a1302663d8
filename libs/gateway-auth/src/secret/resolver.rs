use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

use super::{SecretError, SecretStore};
use crate::SecretString;

/// Resolve the OAuth2 client secret.
///
/// A non-empty `explicit` secret is returned as is and `store` is not
/// consulted. Otherwise the value stored under `name` is fetched, base64
/// decoded and checked to be non-empty UTF-8.
///
/// # Errors
/// Returns [`SecretError`] if the lookup fails, the stored value is empty,
/// or it does not decode to UTF-8 text.
pub async fn resolve(
    explicit: Option<&SecretString>,
    name: &str,
    store: &dyn SecretStore,
) -> Result<SecretString, SecretError> {
    if let Some(secret) = explicit.filter(|s| !s.is_empty()) {
        tracing::debug!("Using client secret supplied by caller");
        return Ok(secret.clone());
    }

    let encoded = Zeroizing::new(store.fetch(name).await?);
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(SecretError::Empty {
            name: name.to_owned(),
        });
    }

    let decoded = STANDARD.decode(encoded).map_err(|source| SecretError::Decode {
        name: name.to_owned(),
        source,
    })?;
    let secret = String::from_utf8(decoded).map_err(|e| {
        // Drop the rejected bytes through Zeroizing as well.
        drop(Zeroizing::new(e.into_bytes()));
        SecretError::NotUtf8 {
            name: name.to_owned(),
        }
    })?;
    if secret.is_empty() {
        return Err(SecretError::Empty {
            name: name.to_owned(),
        });
    }

    tracing::debug!(secret = name, "Resolved client secret from store");
    Ok(SecretString::new(secret))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct FakeStore {
        value: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn returning(value: &str) -> Self {
            Self {
                value: Some(value.to_owned()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SecretStore for FakeStore {
        async fn fetch(&self, name: &str) -> Result<String, SecretError> {
            self.calls.lock().unwrap().push(name.to_owned());
            self.value
                .clone()
                .ok_or_else(|| SecretError::lookup(name, "not found"))
        }
    }

    #[tokio::test]
    async fn explicit_secret_skips_store() {
        let store = FakeStore::returning("aWdub3JlZA==");
        let explicit = SecretString::new("from-cli");
        let secret = resolve(Some(&explicit), "admin-client-auth", &store)
            .await
            .unwrap();
        assert_eq!(secret.expose(), "from-cli");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_explicit_secret_queries_store_by_name() {
        let store = FakeStore::returning("aHVudGVyMg==");
        let empty = SecretString::new("");
        let secret = resolve(Some(&empty), "admin-client-auth", &store)
            .await
            .unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(store.calls(), ["admin-client-auth"]);
    }

    #[tokio::test]
    async fn missing_explicit_secret_queries_store() {
        let store = FakeStore::returning("  aHVudGVyMg==\n");
        let secret = resolve(None, "other", &store).await.unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(store.calls(), ["other"]);
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let store = FakeStore::default();
        let err = resolve(None, "admin-client-auth", &store).await.unwrap_err();
        assert!(matches!(err, SecretError::Lookup { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_store_value_is_rejected() {
        let store = FakeStore::returning("");
        let err = resolve(None, "admin-client-auth", &store).await.unwrap_err();
        assert!(matches!(err, SecretError::Empty { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn bad_base64_is_rejected() {
        let store = FakeStore::returning("not base64!");
        let err = resolve(None, "admin-client-auth", &store).await.unwrap_err();
        assert!(matches!(err, SecretError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn non_utf8_is_rejected() {
        // 0xff 0xfe
        let store = FakeStore::returning("//4=");
        let err = resolve(None, "admin-client-auth", &store).await.unwrap_err();
        assert!(matches!(err, SecretError::NotUtf8 { .. }), "got {err:?}");
    }

    #[tokio::test]
    #[traced_test]
    async fn secret_value_never_logged() {
        let store = FakeStore::returning("aHVudGVyMg==");
        let secret = resolve(None, "admin-client-auth", &store).await.unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert!(logs_contain("Resolved client secret from store"));
        assert!(!logs_contain("hunter2"));
        assert!(!logs_contain("aHVudGVyMg=="));
    }
}
