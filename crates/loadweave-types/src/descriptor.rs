// Resource descriptors and kind classification

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize, NormalizerConfig};

/// What a resource is, derived from its file extension.
///
/// `Other` resources are recorded in lists but never dispatched to the
/// environment, so they produce no pending unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Script,
    Style,
    Other,
}

impl ResourceKind {
    /// Classify a URL by its extension, ignoring any query or fragment.
    pub fn classify(url: &str) -> Self {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        if path.ends_with(".js") {
            ResourceKind::Script
        } else if path.ends_with(".css") {
            ResourceKind::Style
        } else {
            ResourceKind::Other
        }
    }

    /// Whether units of this kind are ever dispatched to the environment.
    pub fn is_loadable(&self) -> bool {
        !matches!(self, ResourceKind::Other)
    }
}

/// An external resource as the orchestrator sees it.
///
/// Immutable once created; produced only by [`ResourceDescriptor::new`],
/// which runs the normalizer so that equal resources always carry equal
/// `normalized_url` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    url: String,
    normalized_url: String,
    kind: ResourceKind,
}

impl ResourceDescriptor {
    pub fn new(url: impl Into<String>, config: &NormalizerConfig) -> Self {
        let url = url.into();
        let normalized_url = normalize(&url, config);
        let kind = ResourceKind::classify(&url);
        Self {
            url,
            normalized_url,
            kind,
        }
    }

    /// The URL exactly as the caller supplied it.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The normalized URL used for deduplication.
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(ResourceKind::classify("a.js"), ResourceKind::Script);
        assert_eq!(ResourceKind::classify("theme.css"), ResourceKind::Style);
        assert_eq!(ResourceKind::classify("logo.png"), ResourceKind::Other);
        assert_eq!(ResourceKind::classify("data"), ResourceKind::Other);
    }

    #[test]
    fn test_classify_ignores_query_and_fragment() {
        assert_eq!(ResourceKind::classify("a.js?v=2"), ResourceKind::Script);
        assert_eq!(ResourceKind::classify("a.css#top"), ResourceKind::Style);
        assert_eq!(ResourceKind::classify("a.png?x=.js"), ResourceKind::Other);
    }

    #[test]
    fn test_loadable_kinds() {
        assert!(ResourceKind::Script.is_loadable());
        assert!(ResourceKind::Style.is_loadable());
        assert!(!ResourceKind::Other.is_loadable());
    }

    #[test]
    fn test_descriptor_normalizes_on_construction() {
        let cfg = NormalizerConfig::new().with_host("h.example.org");
        let descriptor = ResourceDescriptor::new("lib/a.js", &cfg);
        assert_eq!(descriptor.url(), "lib/a.js");
        assert_eq!(descriptor.normalized_url(), "https://h.example.org/lib/a.js");
        assert_eq!(descriptor.kind(), ResourceKind::Script);
    }

    #[test]
    fn test_equal_resources_compare_equal() {
        let cfg = NormalizerConfig::new().with_host("h.example.org");
        let a = ResourceDescriptor::new("lib/a.js", &cfg);
        let b = ResourceDescriptor::new("lib/a.js", &cfg);
        assert_eq!(a, b);
        assert_eq!(a.normalized_url(), b.normalized_url());
    }
}
