// Failure correlation table
//
// Environment-level load failures arrive with no call-stack relationship
// to the code that issued the request. The router owns the sending half
// of every pending unit's future, keyed by correlation tag, and settles
// exactly the right one for each observed event. All settlement flows
// through one message queue, so nothing mutates the table reentrantly
// from inside an environment callback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use loadweave_error::{EnvironmentResult, LoadFailure};
use loadweave_types::{CorrelationTag, UnitId};

use crate::environment::Environment;

/// How a single unit settled.
pub(crate) type UnitOutcome = Result<UnitId, LoadFailure>;

/// Internal settlement events drained by the router task.
#[derive(Debug)]
pub(crate) enum UnitEvent {
    Loaded {
        tag: CorrelationTag,
    },
    Failed {
        tag: Option<CorrelationTag>,
        unit_id: UnitId,
    },
}

struct PendingSlot {
    sender: oneshot::Sender<UnitOutcome>,
    unit_id: UnitId,
    url: String,
}

#[derive(Default)]
struct RouterInner {
    pending: Mutex<HashMap<CorrelationTag, PendingSlot>>,
    error_ids: Mutex<HashSet<UnitId>>,
}

/// Process-wide failure correlation table.
///
/// Constructed once at startup around the environment's global failure
/// channel and shared by every orchestrator instance as an injected
/// capability. Must be created inside a tokio runtime.
pub struct CorrelationRouter {
    events_tx: mpsc::UnboundedSender<UnitEvent>,
    inner: Arc<RouterInner>,
}

impl CorrelationRouter {
    /// Install the router over the environment's failure channel.
    ///
    /// Takes the channel, so a second installation fails with
    /// `EnvironmentError::FailureChannelTaken`.
    pub fn install(environment: &Arc<dyn Environment>) -> EnvironmentResult<Arc<Self>> {
        let mut failures = environment.take_failure_events()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(RouterInner::default());

        tokio::spawn(route_events(events_rx, inner.clone()));

        // Bridge native failure events into the same queue the success
        // watchers feed.
        let bridge_tx = events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = failures.recv().await {
                let forwarded = UnitEvent::Failed {
                    tag: event.tag,
                    unit_id: event.unit_id,
                };
                if bridge_tx.send(forwarded).is_err() {
                    break;
                }
            }
        });

        Ok(Arc::new(Self { events_tx, inner }))
    }

    /// Start tracking one unit; returns the receiving half of its future.
    pub(crate) fn track(
        &self,
        tag: CorrelationTag,
        unit_id: UnitId,
        url: &str,
    ) -> oneshot::Receiver<UnitOutcome> {
        let (sender, receiver) = oneshot::channel();
        let slot = PendingSlot {
            sender,
            unit_id,
            url: url.to_string(),
        };
        self.inner.pending.lock().insert(tag, slot);
        receiver
    }

    /// Sender the per-unit success watchers feed.
    pub(crate) fn events_sender(&self) -> mpsc::UnboundedSender<UnitEvent> {
        self.events_tx.clone()
    }

    /// Ids of every unit that has failed so far, process-wide.
    pub fn error_ids(&self) -> Vec<UnitId> {
        self.inner.error_ids.lock().iter().cloned().collect()
    }
}

async fn route_events(
    mut events: mpsc::UnboundedReceiver<UnitEvent>,
    inner: Arc<RouterInner>,
) {
    while let Some(event) = events.recv().await {
        match event {
            UnitEvent::Loaded { tag } => {
                let slot = inner.pending.lock().remove(&tag);
                match slot {
                    Some(slot) => {
                        debug!(%tag, unit = %slot.unit_id, "unit loaded");
                        let _ = slot.sender.send(Ok(slot.unit_id));
                    }
                    None => warn!(%tag, "success event for unknown unit"),
                }
            }
            UnitEvent::Failed { tag: None, unit_id } => {
                // Not created by this subsystem; not ours to settle.
                warn!(unit = %unit_id, "untagged failure event ignored");
            }
            UnitEvent::Failed {
                tag: Some(tag),
                unit_id,
            } => {
                let slot = inner.pending.lock().remove(&tag);
                match slot {
                    Some(slot) => {
                        warn!(%tag, unit = %unit_id, url = %slot.url, "unit failed");
                        inner.error_ids.lock().insert(slot.unit_id.clone());
                        let failure =
                            LoadFailure::new(slot.unit_id.as_str(), slot.url);
                        let _ = slot.sender.send(Err(failure));
                    }
                    None => warn!(%tag, unit = %unit_id, "failure event for unknown unit"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEnvironment;
    use loadweave_error::EnvironmentError;

    fn environment() -> Arc<dyn Environment> {
        MockEnvironment::new()
    }

    #[tokio::test]
    async fn test_success_event_resolves_tracked_unit() {
        let env = environment();
        let router = CorrelationRouter::install(&env).unwrap();

        let tag = CorrelationTag::new("x", 0);
        let receiver = router.track(tag.clone(), UnitId::new("u1"), "a.js");
        router
            .events_sender()
            .send(UnitEvent::Loaded { tag })
            .unwrap();

        assert_eq!(receiver.await.unwrap(), Ok(UnitId::new("u1")));
        assert!(router.error_ids().is_empty());
    }

    #[tokio::test]
    async fn test_failure_event_rejects_exactly_its_unit() {
        let env = environment();
        let router = CorrelationRouter::install(&env).unwrap();

        let keep = router.track(CorrelationTag::new("x", 0), UnitId::new("u1"), "a.js");
        let fail = router.track(CorrelationTag::new("x", 1), UnitId::new("u2"), "b.js");

        router
            .events_sender()
            .send(UnitEvent::Failed {
                tag: Some(CorrelationTag::new("x", 1)),
                unit_id: UnitId::new("u2"),
            })
            .unwrap();

        let outcome = fail.await.unwrap();
        assert_eq!(outcome, Err(LoadFailure::new("u2", "b.js")));
        assert_eq!(router.error_ids(), vec![UnitId::new("u2")]);

        // The sibling unit stays pending.
        let mut keep = keep;
        assert!(keep.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_untagged_failures_are_ignored() {
        let env = environment();
        let router = CorrelationRouter::install(&env).unwrap();

        let mut receiver =
            router.track(CorrelationTag::new("x", 0), UnitId::new("u1"), "a.js");
        router
            .events_sender()
            .send(UnitEvent::Failed {
                tag: None,
                unit_id: UnitId::new("stranger"),
            })
            .unwrap();
        tokio::task::yield_now().await;

        assert!(receiver.try_recv().is_err());
        assert!(router.error_ids().is_empty());
    }

    #[tokio::test]
    async fn test_router_installs_at_most_once() {
        let env = environment();
        let _router = CorrelationRouter::install(&env).unwrap();
        let second = CorrelationRouter::install(&env);
        assert!(matches!(
            second,
            Err(EnvironmentError::FailureChannelTaken)
        ));
    }

    #[tokio::test]
    async fn test_native_failure_events_are_bridged() {
        let mock = MockEnvironment::new();
        let env: Arc<dyn Environment> = mock.clone();
        let router = CorrelationRouter::install(&env).unwrap();

        let tag = CorrelationTag::new("x", 0);
        let receiver = router.track(tag.clone(), UnitId::new("u1"), "a.js");
        mock.emit_failure(UnitId::new("u1"), Some(tag));

        let outcome = receiver.await.unwrap();
        assert_eq!(outcome, Err(LoadFailure::new("u1", "a.js")));
    }
}
