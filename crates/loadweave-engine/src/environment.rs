// Environment collaborator interface
//
// The environment-specific mechanism for materializing a resource load
// (inserting a script/style element, issuing a fetch) lives behind this
// trait. The engine only ever sees tickets, failure events, and ids.

use tokio::sync::{mpsc, oneshot};

use loadweave_error::EnvironmentResult;
use loadweave_types::{CorrelationTag, NormalizerConfig, ResourceDescriptor, UnitId};

/// A resource already present in the environment before any load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingResource {
    /// URL as the environment reports it (normalized by the scanner).
    pub url: String,
    /// Stable id if the resource already carries one.
    pub existing_id: Option<UnitId>,
}

/// Handle returned by [`Environment::issue_load`].
///
/// `loaded` fires on the resource's native success event. Failures never
/// travel through the ticket; they arrive on the global failure channel
/// carrying the correlation tag.
#[derive(Debug)]
pub struct LoadTicket {
    pub loaded: oneshot::Receiver<()>,
}

/// One failure observed anywhere in the environment.
///
/// `tag` is `None` for failing units the orchestrator did not create;
/// the correlation router ignores those.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub unit_id: UnitId,
    pub tag: Option<CorrelationTag>,
}

/// Host-runtime capabilities the orchestrator consumes.
///
/// All methods are synchronous: issuing a load only *begins* it, and the
/// engine observes completion through the ticket and the failure channel.
pub trait Environment: Send + Sync {
    /// Begin loading a resource, attaching the correlation tag to the
    /// underlying request so failure events can carry it back.
    fn issue_load(
        &self,
        descriptor: &ResourceDescriptor,
        tag: &CorrelationTag,
        unit_id: &UnitId,
    ) -> EnvironmentResult<LoadTicket>;

    /// Take the single environment-wide failure channel.
    ///
    /// May be consumed at most once per process; a second take fails with
    /// `EnvironmentError::FailureChannelTaken`.
    fn take_failure_events(
        &self,
    ) -> EnvironmentResult<mpsc::UnboundedReceiver<FailureEvent>>;

    /// Enumerate resources already present in the environment.
    fn scan_existing(&self) -> Vec<ExistingResource>;

    /// Attach a freshly assigned id to a pre-existing resource so later
    /// scans and removals can address it.
    fn adopt_existing(&self, url: &str, id: &UnitId);

    /// Tear down a previously issued or matched resource.
    fn remove_resource(&self, id: &UnitId);

    /// Generate an identifier that is collision-free within the
    /// environment's ID namespace at the time of the call.
    fn assign_id(&self, length: usize) -> UnitId;

    /// Base settings for URL normalization (current scheme and host).
    fn base(&self) -> NormalizerConfig;
}
