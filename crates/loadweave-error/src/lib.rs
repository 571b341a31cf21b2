// Loadweave error handling framework
// Central location for error types, traits, and result aliases

use std::error::Error as StdError;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use thiserror;

mod environment;
mod failure;
mod orchestration;

pub use environment::{EnvironmentError, EnvironmentResult};
pub use failure::LoadFailure;
pub use orchestration::{OrchestrationError, OrchestrationResult};

/// Base trait for all errors in the loadweave system.
///
/// Gives every error a stable, machine-readable code alongside its
/// `Display` message.
pub trait LoadweaveError: StdError + Send + Sync + 'static {
    /// Returns a unique static string code for this error type.
    fn error_code(&self) -> &'static str;

    /// Provides a brief description of the error (defaults to Display impl).
    fn description(&self) -> String {
        format!("{}", self)
    }
}

/// Umbrella error for engine entry points that can fail either through
/// caller misuse or through the environment collaborator.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl LoadweaveError for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            EngineError::Orchestration(e) => e.error_code(),
            EngineError::Environment(e) => e.error_code(),
        }
    }
}

/// Standard Result type for engine entry points.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_umbrella_conversion() {
        let err: EngineError =
            OrchestrationError::UnregisteredList("missing".to_string()).into();
        assert_eq!(err.error_code(), "ORCH_UNREGISTERED_LIST");

        let err: EngineError = EnvironmentError::FailureChannelTaken.into();
        assert_eq!(err.error_code(), "ENV_FAILURE_CHANNEL_TAKEN");
    }
}
