// Errors surfaced by the environment collaborator

use thiserror::Error;

use crate::LoadweaveError;

/// Failures reported synchronously by the host environment while the
/// orchestrator drives it (issuing a load, wiring the failure channel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    /// The environment could not begin loading a resource.
    #[error("failed to issue load for '{url}': {reason}")]
    IssueFailed { url: String, reason: String },

    /// The global failure channel may be consumed at most once per process.
    #[error("the global failure channel was already taken")]
    FailureChannelTaken,

    #[error("environment error: {0}")]
    Other(String),
}

impl LoadweaveError for EnvironmentError {
    fn error_code(&self) -> &'static str {
        match self {
            EnvironmentError::IssueFailed { .. } => "ENV_ISSUE_FAILED",
            EnvironmentError::FailureChannelTaken => "ENV_FAILURE_CHANNEL_TAKEN",
            EnvironmentError::Other(_) => "ENV_OTHER",
        }
    }
}

pub type EnvironmentResult<T> = std::result::Result<T, EnvironmentError>;
