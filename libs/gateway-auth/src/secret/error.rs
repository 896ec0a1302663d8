use thiserror::Error;

/// Failure to obtain the client secret.
///
/// Messages name the secret but never carry its value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecretError {
    #[error("secret store lookup for '{name}' failed: {reason}")]
    Lookup { name: String, reason: String },

    #[error("secret '{name}' is empty")]
    Empty { name: String },

    #[error("secret '{name}' is not valid base64: {source}")]
    Decode {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("secret '{name}' is not valid UTF-8")]
    NotUtf8 { name: String },
}

impl SecretError {
    pub(crate) fn lookup(name: &str, reason: impl Into<String>) -> Self {
        Self::Lookup {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
