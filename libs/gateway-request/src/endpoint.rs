/// Prefix joined to relative endpoints.
pub const DEFAULT_ENDPOINT_PREFIX: &str = "https://api-gw-service-nmn.local/apis/";

/// Turns a caller-supplied endpoint into the URL to call.
///
/// Anything starting with `http` is taken as absolute and returned as is;
/// everything else is appended to the prefix with no further normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    prefix: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_PREFIX)
    }
}

impl EndpointResolver {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn resolve(&self, raw: &str) -> String {
        if raw.starts_with("http") {
            raw.to_owned()
        } else {
            format!("{}{raw}", self.prefix)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn relative_endpoint_is_prefixed() {
        let r = EndpointResolver::default();
        assert_eq!(
            r.resolve("bos/v1/sessiontemplate"),
            "https://api-gw-service-nmn.local/apis/bos/v1/sessiontemplate"
        );
    }

    #[test]
    fn absolute_endpoint_passes_through() {
        let r = EndpointResolver::default();
        let url = "https://other.local/api/v1/thing";
        assert_eq!(r.resolve(url), url);
        assert_eq!(r.resolve("http://plain.local/x"), "http://plain.local/x");
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = EndpointResolver::default();
        let once = r.resolve("smd/hsm/v2/State/Components");
        assert_eq!(r.resolve(&once), once);
    }

    #[test]
    fn no_normalization_of_slashes() {
        let r = EndpointResolver::default();
        assert_eq!(
            r.resolve("/bss/boot/v1"),
            "https://api-gw-service-nmn.local/apis//bss/boot/v1"
        );
        assert_eq!(r.resolve(""), DEFAULT_ENDPOINT_PREFIX);
    }

    #[test]
    fn custom_prefix() {
        let r = EndpointResolver::new("http://127.0.0.1:8080/apis/");
        assert_eq!(r.prefix(), "http://127.0.0.1:8080/apis/");
        assert_eq!(r.resolve("cfs/v2/sessions"), "http://127.0.0.1:8080/apis/cfs/v2/sessions");
    }
}
