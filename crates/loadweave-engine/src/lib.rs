// Loadweave engine
//
// Ordered, deduplicating, asynchronous resource-loading orchestrator.
// Given named lists of external resources it issues every load request
// eagerly, tracks per-resource completion through oneshot futures,
// aggregates per-list completion behind an AND-barrier, chains lists so
// that list N's callbacks and list N+1's aggregation only start once
// list N has settled, skips resources already present in the
// environment, and routes environment-wide failure events back to the
// exact pending unit that caused them.

pub mod callback;
pub mod config;
pub mod correlation;
pub mod environment;
pub mod list;
pub mod orchestrator;
pub mod registry;
pub mod scan;
pub mod testing;

pub use callback::{CallbackDescriptor, CallbackInvocation};
pub use config::EngineConfig;
pub use correlation::CorrelationRouter;
pub use environment::{Environment, ExistingResource, FailureEvent, LoadTicket};
pub use list::{ListOutcome, ListState, RejectReason};
pub use orchestrator::{LoadTarget, Orchestrator, Registration};

// Re-export the shared data model and error taxonomy
pub use loadweave_error::{
    EngineError, EngineResult, EnvironmentError, LoadFailure, OrchestrationError,
};
pub use loadweave_types::{
    normalize, CorrelationTag, NormalizerConfig, ResourceDescriptor, ResourceKind, UnitId,
};
