// Synchronous misuse errors raised at the orchestrator call sites

use thiserror::Error;

use crate::LoadweaveError;

/// Programmer errors thrown synchronously by `register()` / `load()` /
/// `done()` / `fail()`. These abort the call immediately; they are never
/// routed through a list's aggregate future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    /// A list with this name is already registered on the instance.
    #[error("a list named '{0}' is already registered")]
    DuplicateListName(String),

    /// `load()` was given a name that was never registered.
    #[error("no list named '{0}' is registered")]
    UnregisteredList(String),

    /// The list's aggregate future already exists; reloading would issue
    /// duplicate requests, so it is rejected rather than deduplicated.
    #[error("list '{0}' has already been loaded")]
    AlreadyLoaded(String),

    /// `done()` / `fail()` were called before any list was loaded.
    #[error("no list is currently loading")]
    NoCurrentList,
}

impl LoadweaveError for OrchestrationError {
    fn error_code(&self) -> &'static str {
        match self {
            OrchestrationError::DuplicateListName(_) => "ORCH_DUPLICATE_LIST_NAME",
            OrchestrationError::UnregisteredList(_) => "ORCH_UNREGISTERED_LIST",
            OrchestrationError::AlreadyLoaded(_) => "ORCH_ALREADY_LOADED",
            OrchestrationError::NoCurrentList => "ORCH_NO_CURRENT_LIST",
        }
    }
}

pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;
