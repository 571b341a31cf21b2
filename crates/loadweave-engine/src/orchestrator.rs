// Load orchestrator / barrier sequencer
//
// `load()` issues every request in a list immediately, so network-bound
// work across multiple lists overlaps on the wire. Only aggregation is
// gated: a list's AND-barrier is built, and its callbacks run, strictly
// after the previously loaded list has settled. A rejected list
// short-circuits every list chained after it onto the failure path.

use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use loadweave_error::{EngineResult, OrchestrationError};
use loadweave_types::{CorrelationTag, NormalizerConfig, ResourceDescriptor, UnitId};

use crate::callback::CallbackDescriptor;
use crate::config::EngineConfig;
use crate::correlation::{CorrelationRouter, UnitEvent};
use crate::environment::Environment;
use crate::list::{
    await_gate, harvest_settled, GateReceiver, GateSender, ListOutcome, ListState, LoadList,
    PendingUnit, RejectReason,
};
use crate::registry::{ListHandle, ListRegistry};
use crate::scan::scan;

/// What `load()` accepts: a registered list name, or a raw resource
/// vector registered implicitly under a generated name.
#[derive(Debug, Clone)]
pub enum LoadTarget {
    Name(String),
    Resources(Vec<String>),
}

impl From<&str> for LoadTarget {
    fn from(name: &str) -> Self {
        LoadTarget::Name(name.to_string())
    }
}

impl From<String> for LoadTarget {
    fn from(name: String) -> Self {
        LoadTarget::Name(name)
    }
}

impl From<Vec<String>> for LoadTarget {
    fn from(urls: Vec<String>) -> Self {
        LoadTarget::Resources(urls)
    }
}

impl From<Vec<&str>> for LoadTarget {
    fn from(urls: Vec<&str>) -> Self {
        LoadTarget::Resources(urls.into_iter().map(String::from).collect())
    }
}

/// Result of `register()`: the (possibly generated) list name and the
/// resources still pending after deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub resources: Vec<ResourceDescriptor>,
}

#[derive(Default)]
struct State {
    registry: ListRegistry,
    created_ids: HashSet<UnitId>,
    preexisting_ids: HashSet<UnitId>,
    previous_list: Option<String>,
    current_list: Option<String>,
}

struct Inner {
    environment: Arc<dyn Environment>,
    router: Arc<CorrelationRouter>,
    config: EngineConfig,
    state: Mutex<State>,
}

/// One orchestrator instance: owns its list registry, its created /
/// pre-existing id sets, and the sequencing cursor chaining lists.
///
/// Cheap to clone; clones share the same instance. Methods must be
/// called inside a tokio runtime because `load()` spawns driver tasks.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        environment: Arc<dyn Environment>,
        router: Arc<CorrelationRouter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                environment,
                router,
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn normalizer(&self) -> NormalizerConfig {
        self.inner
            .config
            .normalizer
            .clone()
            .unwrap_or_else(|| self.inner.environment.base())
    }

    /// Register a named list of resources.
    ///
    /// Runs the deduplicator first: resources already present in the
    /// environment are dropped from the list and their ids recorded as
    /// pre-existing. A blank or omitted name is replaced by a generated
    /// collision-free one.
    pub fn register<S: AsRef<str>>(
        &self,
        urls: &[S],
        name: Option<&str>,
    ) -> EngineResult<Registration> {
        let normalizer = self.normalizer();
        let mut resources: Vec<ResourceDescriptor> = urls
            .iter()
            .map(|url| ResourceDescriptor::new(url.as_ref(), &normalizer))
            .collect();
        let matched = scan(
            &mut resources,
            self.inner.environment.as_ref(),
            &normalizer,
            self.inner.config.id_length,
        );

        let mut state = self.inner.state.lock();
        for m in &matched {
            // created and pre-existing ids stay disjoint
            debug_assert!(!state.created_ids.contains(&m.assigned_id));
            state.preexisting_ids.insert(m.assigned_id.clone());
        }

        let name = match name.map(ListRegistry::normalize_name) {
            Some(normalized) if !normalized.is_empty() => normalized,
            _ => state
                .registry
                .generate_name(self.inner.config.list_name_length),
        };
        state
            .registry
            .insert(LoadList::new(name.clone(), resources.clone()))?;
        debug!(
            list = %name,
            pending = resources.len(),
            deduplicated = matched.len(),
            "registered list"
        );
        Ok(Registration { name, resources })
    }

    /// Load a list: issue every pending unit immediately, then gate the
    /// aggregation behind the previously loaded list's settlement.
    ///
    /// Loading the same name twice is `AlreadyLoaded`, not a silent
    /// dedup. Returns `&Self` for chaining.
    pub fn load(
        &self,
        target: impl Into<LoadTarget>,
        on_success: Option<CallbackDescriptor>,
        on_failure: Option<CallbackDescriptor>,
    ) -> EngineResult<&Self> {
        // Step 1: resolve the target to a registered list.
        let (name, handle) = match target.into() {
            LoadTarget::Name(raw) => {
                let name = ListRegistry::normalize_name(&raw);
                let state = self.inner.state.lock();
                let handle = state
                    .registry
                    .get(&name)
                    .ok_or(OrchestrationError::UnregisteredList(name.clone()))?;
                (name, handle)
            }
            LoadTarget::Resources(urls) => {
                let registration = self.register(&urls, None)?;
                let state = self.inner.state.lock();
                let handle = state
                    .registry
                    .get(&registration.name)
                    .ok_or_else(|| OrchestrationError::UnregisteredList(registration.name.clone()))?;
                (registration.name, handle)
            }
        };

        // Step 2: reserve the gate and issue every pending unit right
        // away, regardless of any other list's state. The reload check
        // and the reservation share one lock acquisition, so two
        // concurrent loads of the same list cannot both issue.
        let (gate_tx, gate_rx) = watch::channel(None);
        let resources = {
            let mut list = handle.lock();
            if list.gate.is_some() {
                return Err(OrchestrationError::AlreadyLoaded(name).into());
            }
            list.gate = Some(gate_rx);
            list.state = ListState::Issuing;
            if let Some(descriptor) = on_success {
                list.callbacks.push_success(descriptor);
            }
            if let Some(descriptor) = on_failure {
                list.callbacks.push_failure(descriptor);
            }
            list.resources.clone()
        };

        let mut units = Vec::new();
        for (index, descriptor) in resources.iter().enumerate() {
            if !descriptor.kind().is_loadable() {
                debug!(url = %descriptor.url(), "resource recorded but not dispatched");
                continue;
            }
            let unit_id = self.inner.environment.assign_id(self.inner.config.id_length);
            let tag = CorrelationTag::new(name.clone(), index);
            let receiver =
                self.inner
                    .router
                    .track(tag.clone(), unit_id.clone(), descriptor.normalized_url());
            let ticket = self.inner.environment.issue_load(descriptor, &tag, &unit_id)?;

            // Forward the ticket's native success into the router queue.
            let events = self.inner.router.events_sender();
            tokio::spawn(async move {
                if ticket.loaded.await.is_ok() {
                    let _ = events.send(UnitEvent::Loaded { tag });
                }
            });

            debug!(list = %name, index, unit = %unit_id, "issued load request");
            units.push(PendingUnit {
                id: unit_id,
                index,
                receiver,
            });
        }
        {
            let mut state = self.inner.state.lock();
            for unit in &units {
                state.created_ids.insert(unit.id.clone());
            }
        }

        // Step 3: advance the sequencing cursor and pick up the previous
        // list's gate.
        let (previous_name, previous_gate) = {
            let mut state = self.inner.state.lock();
            let previous = state.current_list.take();
            state.previous_list = previous.clone();
            state.current_list = Some(name.clone());
            let gate = previous
                .as_deref()
                .and_then(|prior| state.registry.get(prior))
                .and_then(|prior| prior.lock().gate.clone());
            (previous, gate)
        };

        tokio::spawn(drive_list(
            handle.clone(),
            name,
            units,
            previous_name,
            previous_gate,
            gate_tx,
        ));
        Ok(self)
    }

    /// Register additional success callbacks against the current list.
    ///
    /// If the list already resolved they fire immediately with its
    /// result ids; if it rejected they never fire.
    pub fn done(
        &self,
        callbacks: impl IntoIterator<Item = CallbackDescriptor>,
    ) -> EngineResult<&Self> {
        self.register_post_hoc(callbacks, true)
    }

    /// Register additional failure callbacks against the current list.
    pub fn fail(
        &self,
        callbacks: impl IntoIterator<Item = CallbackDescriptor>,
    ) -> EngineResult<&Self> {
        self.register_post_hoc(callbacks, false)
    }

    fn register_post_hoc(
        &self,
        callbacks: impl IntoIterator<Item = CallbackDescriptor>,
        on_success: bool,
    ) -> EngineResult<&Self> {
        let handle = {
            let state = self.inner.state.lock();
            let name = state
                .current_list
                .clone()
                .ok_or(OrchestrationError::NoCurrentList)?;
            state
                .registry
                .get(&name)
                .ok_or(OrchestrationError::UnregisteredList(name))?
        };

        let fire_with = {
            let mut list = handle.lock();
            match &list.settled {
                None => {
                    for descriptor in callbacks {
                        if on_success {
                            list.callbacks.push_success(descriptor);
                        } else {
                            list.callbacks.push_failure(descriptor);
                        }
                    }
                    return Ok(self);
                }
                Some(ListOutcome::Resolved(ids)) if on_success => Some(ids.clone()),
                Some(ListOutcome::Rejected { loaded, .. }) if !on_success => {
                    Some(loaded.clone())
                }
                // Settled the other way; these callbacks never fire.
                Some(_) => None,
            }
        };
        if let Some(ids) = fire_with {
            for descriptor in callbacks {
                descriptor.invoke(&ids);
            }
        }
        Ok(self)
    }

    /// Remove every resource this instance created; with
    /// `include_preexisting` also those matched during deduplication.
    /// Clears the registry, so previously used list names become legal
    /// again.
    pub fn destroy(&self, include_preexisting: bool) {
        let (created, preexisting) = {
            let mut state = self.inner.state.lock();
            let created = mem::take(&mut state.created_ids);
            let preexisting = if include_preexisting {
                mem::take(&mut state.preexisting_ids)
            } else {
                HashSet::new()
            };
            state.registry.clear();
            state.previous_list = None;
            state.current_list = None;
            (created, preexisting)
        };
        for id in created.iter().chain(preexisting.iter()) {
            self.inner.environment.remove_resource(id);
        }
        debug!(
            removed = created.len() + preexisting.len(),
            "destroyed orchestrator resources"
        );
    }

    /// Current lifecycle state of a list, if registered.
    pub fn list_state(&self, name: &str) -> Option<ListState> {
        let state = self.inner.state.lock();
        state.registry.get(name).map(|list| list.lock().state)
    }

    /// Ids of units this instance caused to load.
    pub fn created_ids(&self) -> Vec<UnitId> {
        self.inner.state.lock().created_ids.iter().cloned().collect()
    }

    /// Ids of resources matched during deduplication.
    pub fn preexisting_ids(&self) -> Vec<UnitId> {
        self.inner
            .state
            .lock()
            .preexisting_ids
            .iter()
            .cloned()
            .collect()
    }

    /// Name of the most recently loaded list.
    pub fn current_list(&self) -> Option<String> {
        self.inner.state.lock().current_list.clone()
    }

    /// Name of the list loaded before the current one, if any.
    pub fn previous_list(&self) -> Option<String> {
        self.inner.state.lock().previous_list.clone()
    }

    pub fn router(&self) -> &Arc<CorrelationRouter> {
        &self.inner.router
    }
}

// Manual impl: `Inner` holds trait objects.
impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Orchestrator")
            .field("current_list", &state.current_list)
            .field("previous_list", &state.previous_list)
            .field("created", &state.created_ids.len())
            .field("preexisting", &state.preexisting_ids.len())
            .finish_non_exhaustive()
    }
}

/// Per-list driver: waits for the previous list's gate, aggregates this
/// list's units, dispatches callbacks, then settles this list's gate.
async fn drive_list(
    handle: ListHandle,
    name: String,
    mut units: Vec<PendingUnit>,
    previous_name: Option<String>,
    previous_gate: Option<GateReceiver>,
    gate: GateSender,
) {
    let upstream = match previous_gate {
        None => None,
        Some(receiver) => {
            handle.lock().state = ListState::AwaitingBarrier;
            Some(await_gate(receiver).await)
        }
    };

    let outcome = match upstream {
        Some(ListOutcome::Rejected { .. }) => {
            // The failure dispatch runs immediately, without waiting for
            // this list's own units; partial results are whatever has
            // settled by now.
            let loaded = harvest_settled(&mut units);
            ListOutcome::Rejected {
                loaded,
                reason: RejectReason::UpstreamRejected {
                    list: previous_name.unwrap_or_default(),
                },
            }
        }
        _ => {
            handle.lock().state = ListState::Aggregating;
            aggregate(units).await
        }
    };

    let callbacks = {
        let mut list = handle.lock();
        list.state = match &outcome {
            ListOutcome::Resolved(_) => ListState::Resolved,
            ListOutcome::Rejected { .. } => ListState::Rejected,
        };
        list.settled = Some(outcome.clone());
        list.callbacks.clone()
    };
    match &outcome {
        ListOutcome::Resolved(ids) => {
            debug!(list = %name, units = ids.len(), "list resolved");
            callbacks.dispatch_success(ids);
        }
        ListOutcome::Rejected { loaded, reason } => {
            warn!(list = %name, ?reason, "list rejected");
            callbacks.dispatch_failure(loaded);
        }
    }
    // Settle the gate after the callbacks so list N's dispatch always
    // precedes list N+1's aggregation.
    let _ = gate.send(Some(outcome));
}

/// AND-barrier over a list's unit futures: resolves with every id in
/// list order once all resolve, rejects on the first rejection carrying
/// the ids that did load first.
async fn aggregate(units: Vec<PendingUnit>) -> ListOutcome {
    let mut slots: Vec<Option<UnitId>> = Vec::new();
    slots.resize(units.len(), None);

    let mut pending = FuturesUnordered::new();
    for (slot, unit) in units.into_iter().enumerate() {
        let PendingUnit { id, index, receiver } = unit;
        pending.push(async move { (slot, index, id, receiver.await) });
    }

    while let Some((slot, index, id, settled)) = pending.next().await {
        match settled {
            Ok(Ok(unit_id)) => slots[slot] = Some(unit_id),
            Ok(Err(failure)) => {
                let loaded = slots.iter().flatten().cloned().collect();
                return ListOutcome::Rejected {
                    loaded,
                    reason: RejectReason::Unit(failure),
                };
            }
            Err(_) => {
                warn!(unit = %id, index, "tracking channel closed without settling");
                let loaded = slots.iter().flatten().cloned().collect();
                return ListOutcome::Rejected {
                    loaded,
                    reason: RejectReason::TrackingLost { unit_id: id },
                };
            }
        }
    }
    ListOutcome::Resolved(slots.into_iter().flatten().collect())
}
