// Asynchronous per-unit load failure

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LoadweaveError;

/// One resource failed to load.
///
/// Never thrown synchronously: this value travels through the failure
/// correlation table, rejects the owning unit's future, and surfaces via
/// the list's aggregate rejection and its failure callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("resource '{url}' failed to load (unit {unit_id})")]
pub struct LoadFailure {
    /// Environment-wide id of the failed unit.
    pub unit_id: String,
    /// Normalized URL of the resource that failed.
    pub url: String,
}

impl LoadFailure {
    pub fn new(unit_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            url: url.into(),
        }
    }
}

impl LoadweaveError for LoadFailure {
    fn error_code(&self) -> &'static str {
        "LOAD_RESOURCE_FAILED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = LoadFailure::new("ld_7", "https://x.org/a.js");
        assert_eq!(
            failure.to_string(),
            "resource 'https://x.org/a.js' failed to load (unit ld_7)"
        );
        assert_eq!(failure.error_code(), "LOAD_RESOURCE_FAILED");
    }

    #[test]
    fn test_failure_serializes() {
        let failure = LoadFailure::new("ld_7", "a.js");
        let json = serde_json::to_string(&failure).unwrap();
        let back: LoadFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure, back);
    }
}
