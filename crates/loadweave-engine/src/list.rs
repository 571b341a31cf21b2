// Load lists, pending units, and the per-list aggregate gate

use tokio::sync::{oneshot, watch};
use tracing::error;

use loadweave_error::LoadFailure;
use loadweave_types::{ResourceDescriptor, UnitId};

use crate::callback::CallbackSet;
use crate::correlation::UnitOutcome;

/// Lifecycle of one load list. `Resolved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    /// Registered, units not yet dispatched.
    Pending,
    /// Units dispatched to the environment.
    Issuing,
    /// Chained behind an earlier list that has not settled yet.
    AwaitingBarrier,
    /// AND-barrier over the list's unit futures is running.
    Aggregating,
    Resolved,
    Rejected,
}

/// Why a list's aggregate rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// One of this list's own units failed to load.
    Unit(LoadFailure),
    /// A list chained before this one rejected; this list never
    /// aggregated its own units.
    UpstreamRejected { list: String },
    /// A unit's tracking channel closed without settling.
    TrackingLost { unit_id: UnitId },
}

/// Settlement of a list's aggregate future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// Every unit resolved; ids are in list order.
    Resolved(Vec<UnitId>),
    /// At least one unit failed (or an upstream list did). `loaded`
    /// carries the partial set of ids that did resolve first.
    Rejected {
        loaded: Vec<UnitId>,
        reason: RejectReason,
    },
}

/// One in-flight load attempt for a single resource.
///
/// Owned exclusively by the driver of the list that created it; the
/// correlation router holds the sending half keyed by tag.
#[derive(Debug)]
pub(crate) struct PendingUnit {
    pub id: UnitId,
    pub index: usize,
    pub receiver: oneshot::Receiver<UnitOutcome>,
}

pub(crate) type GateSender = watch::Sender<Option<ListOutcome>>;
pub(crate) type GateReceiver = watch::Receiver<Option<ListOutcome>>;

/// A named, ordered list of resources and its aggregation state.
#[derive(Debug)]
pub(crate) struct LoadList {
    pub name: String,
    pub resources: Vec<ResourceDescriptor>,
    pub state: ListState,
    /// Present once `load()` ran; doubles as the reload guard.
    pub gate: Option<GateReceiver>,
    pub callbacks: CallbackSet,
    pub settled: Option<ListOutcome>,
}

impl LoadList {
    pub fn new(name: String, resources: Vec<ResourceDescriptor>) -> Self {
        Self {
            name,
            resources,
            state: ListState::Pending,
            gate: None,
            callbacks: CallbackSet::default(),
            settled: None,
        }
    }
}

/// Wait until a list's gate settles.
///
/// If the gate sender disappears without settling the list stays pending
/// forever, which is the documented behavior for a list that never
/// completes: everything chained after it blocks.
pub(crate) async fn await_gate(mut gate: GateReceiver) -> ListOutcome {
    loop {
        if let Some(outcome) = gate.borrow_and_update().clone() {
            return outcome;
        }
        if gate.changed().await.is_err() {
            if let Some(outcome) = gate.borrow().clone() {
                return outcome;
            }
            error!("list gate closed without settling; chained lists stay pending");
            std::future::pending::<()>().await;
        }
    }
}

/// Collect the ids of units that have already resolved, without waiting.
///
/// Used on the upstream-rejection path, where a list's failure dispatch
/// runs immediately with whatever partial results exist.
pub(crate) fn harvest_settled(units: &mut [PendingUnit]) -> Vec<UnitId> {
    let mut loaded = Vec::new();
    for unit in units.iter_mut() {
        if let Ok(Ok(id)) = unit.receiver.try_recv() {
            loaded.push(id);
        }
    }
    loaded
}
