// URL normalization rules
//
// Normalization makes two spellings of the same resource compare equal,
// which is what the existing-resource deduplication relies on.

use serde::{Deserialize, Serialize};

/// Settings the normalizer resolves relative URLs against.
///
/// `scheme` carries its trailing colon (`"https:"`); `host` carries no
/// scheme and no trailing slash. `prepend` and `append` are applied to
/// every relative URL (`append` also to absolute ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub scheme: String,
    pub host: String,
    pub prepend: String,
    pub append: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            scheme: "https:".to_string(),
            host: String::new(),
            prepend: String::new(),
            append: String::new(),
        }
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = prepend.into();
        self
    }

    pub fn with_append(mut self, append: impl Into<String>) -> Self {
        self.append = append.into();
        self
    }
}

/// Whether a URL already carries a scheme (or is protocol-relative).
pub fn is_absolute(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        None => false,
    }
}

/// Normalize a URL so identical resources compare equal regardless of how
/// they were specified.
///
/// Absolute URLs pass through with only `append` attached. Relative URLs
/// become `scheme + "//" + host/ + prepend + url + append`; the host is
/// only injected when `prepend + url` does not already begin with it.
/// Same inputs always normalize identically.
pub fn normalize(url: &str, config: &NormalizerConfig) -> String {
    if is_absolute(url) {
        return format!("{}{}", url, config.append);
    }

    let path = format!("{}{}", config.prepend, url);
    if config.host.is_empty() || path.starts_with(&config.host) {
        format!("{}//{}{}", config.scheme, path, config.append)
    } else {
        format!("{}//{}/{}{}", config.scheme, config.host, path, config.append)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NormalizerConfig {
        NormalizerConfig::new()
            .with_scheme("https:")
            .with_host("cdn.example.org")
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let cfg = config();
        assert_eq!(
            normalize("https://other.org/app.js", &cfg),
            "https://other.org/app.js"
        );
    }

    #[test]
    fn test_absolute_url_still_gets_append() {
        let cfg = config().with_append("?v=3");
        assert_eq!(
            normalize("https://other.org/app.js", &cfg),
            "https://other.org/app.js?v=3"
        );
    }

    #[test]
    fn test_protocol_relative_counts_as_absolute() {
        let cfg = config();
        assert_eq!(
            normalize("//other.org/app.js", &cfg),
            "//other.org/app.js"
        );
    }

    #[test]
    fn test_relative_url_gets_scheme_and_host() {
        let cfg = config();
        assert_eq!(
            normalize("assets/app.js", &cfg),
            "https://cdn.example.org/assets/app.js"
        );
    }

    #[test]
    fn test_prepend_and_append_applied() {
        let cfg = config().with_prepend("static/").with_append("?v=7");
        assert_eq!(
            normalize("app.js", &cfg),
            "https://cdn.example.org/static/app.js?v=7"
        );
    }

    #[test]
    fn test_host_not_injected_twice() {
        let cfg = config();
        assert_eq!(
            normalize("cdn.example.org/app.js", &cfg),
            "https://cdn.example.org/app.js"
        );
    }

    #[test]
    fn test_empty_host_never_injected() {
        let cfg = NormalizerConfig::new();
        assert_eq!(normalize("app.js", &cfg), "https://app.js");
    }

    #[test]
    fn test_determinism() {
        let cfg = config().with_prepend("p/").with_append("?a");
        let first = normalize("lib/app.js", &cfg);
        let second = normalize("lib/app.js", &cfg);
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("https://x.org/a.js"));
        assert!(is_absolute("chrome-extension://abc/a.js"));
        assert!(is_absolute("//x.org/a.js"));
        assert!(!is_absolute("a.js"));
        assert!(!is_absolute("path/to/a.js"));
        assert!(!is_absolute("1http://bad"));
    }
}
