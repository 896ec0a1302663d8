//! TLS utilities for the HTTP client.
//!
//! Native roots are loaded once and cached. CA bundles are read from disk
//! on every build so a rotated bundle is picked up by the next client.

use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Cached native root certificates; empty means none were found.
static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    let certs: Vec<CertificateDer<'static>> = result.certs;

    if certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = certs.len(), "loaded native root certificates");
    }

    certs
}

/// Get cached native root certificates (may be empty).
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(load_native_certs_inner)
        .as_slice()
}

/// Get the crypto provider for TLS connections.
///
/// Uses the process-wide default if one is installed, otherwise an
/// aws-lc-rs provider that is not installed globally.
pub fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn client_config_from_roots(
    root_store: rustls::RootCertStore,
) -> Result<rustls::ClientConfig, String> {
    let provider = get_crypto_provider();

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("failed to set TLS protocol versions: {e}"))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

/// Build a rustls `ClientConfig` using the cached native root certificates.
///
/// # Errors
///
/// Returns an error if the OS store is empty or no certificate parses.
pub fn native_roots_client_config() -> Result<rustls::ClientConfig, String> {
    let certs = native_root_certs();

    if certs.is_empty() {
        return Err("no native root CA certificates found in OS certificate store".to_owned());
    }

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs.iter().cloned());

    if ignored > 0 {
        tracing::warn!(
            added = added,
            ignored = ignored,
            "some native root certificates could not be parsed"
        );
    }

    if added == 0 {
        return Err(format!(
            "no valid native root CA certificates parsed (found {}, all {} failed to parse)",
            certs.len(),
            ignored
        ));
    }

    client_config_from_roots(root_store)
}

/// Read every certificate from a PEM bundle.
///
/// # Errors
///
/// Returns an error if the file cannot be read, contains malformed PEM, or
/// holds no certificates.
pub fn load_ca_bundle(path: &Path) -> Result<Vec<CertificateDer<'static>>, String> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| format!("failed to open CA bundle {}: {e}", path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("failed to parse CA bundle {}: {e}", path.display()))?;

    if certs.is_empty() {
        return Err(format!(
            "CA bundle {} contains no certificates",
            path.display()
        ));
    }

    tracing::debug!(
        path = %path.display(),
        count = certs.len(),
        "loaded CA bundle"
    );

    Ok(certs)
}

/// Build a rustls `ClientConfig` that trusts only the certificates in `path`.
///
/// # Errors
///
/// Returns an error if the bundle cannot be loaded or none of its
/// certificates is a usable trust anchor.
pub fn ca_bundle_client_config(path: &Path) -> Result<rustls::ClientConfig, String> {
    let certs = load_ca_bundle(path)?;
    let found = certs.len();

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs);

    if added == 0 {
        return Err(format!(
            "no valid CA certificates in {} (found {found}, all {ignored} rejected)",
            path.display()
        ));
    }

    client_config_from_roots(root_store)
}
