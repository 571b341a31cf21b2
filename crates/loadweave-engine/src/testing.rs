// Deterministic in-memory environment for tests
//
// Loads complete only when the test says so: `complete(url)` fires the
// ticket's native success, `emit_failure(..)` pushes an event onto the
// global failure channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use loadweave_error::{EnvironmentError, EnvironmentResult};
use loadweave_types::{CorrelationTag, NormalizerConfig, ResourceDescriptor, UnitId};

use crate::environment::{Environment, ExistingResource, FailureEvent, LoadTicket};

#[derive(Debug)]
struct IssuedLoad {
    url: String,
    normalized_url: String,
    unit_id: UnitId,
    tag: CorrelationTag,
    success: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct MockInner {
    existing: Vec<ExistingResource>,
    issued: Vec<IssuedLoad>,
    removed: Vec<UnitId>,
    adopted: Vec<(String, UnitId)>,
    counter: u64,
}

/// Scriptable [`Environment`] implementation.
pub struct MockEnvironment {
    inner: Mutex<MockInner>,
    failures_tx: mpsc::UnboundedSender<FailureEvent>,
    failures_rx: Mutex<Option<mpsc::UnboundedReceiver<FailureEvent>>>,
    base: NormalizerConfig,
}

impl MockEnvironment {
    pub fn new() -> Arc<Self> {
        Self::with_base(NormalizerConfig::new().with_host("test.example.org"))
    }

    pub fn with_base(base: NormalizerConfig) -> Arc<Self> {
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            inner: Mutex::new(MockInner::default()),
            failures_tx,
            failures_rx: Mutex::new(Some(failures_rx)),
            base,
        })
    }

    /// Script a resource as already present in the environment.
    pub fn add_existing(&self, url: &str, id: Option<UnitId>) {
        self.inner.lock().existing.push(ExistingResource {
            url: url.to_string(),
            existing_id: id,
        });
    }

    /// Fire the native success event of an issued load whose URL (raw or
    /// normalized) contains `fragment`. Returns false when nothing
    /// matched or the load already completed.
    pub fn complete(&self, fragment: &str) -> bool {
        let sender = {
            let mut inner = self.inner.lock();
            inner
                .issued
                .iter_mut()
                .find(|load| {
                    load.url.contains(fragment) || load.normalized_url.contains(fragment)
                })
                .and_then(|load| load.success.take())
        };
        match sender {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }

    /// Push a failure event for an issued load onto the global channel,
    /// carrying its correlation tag.
    pub fn fail(&self, fragment: &str) -> bool {
        let event = {
            let inner = self.inner.lock();
            inner
                .issued
                .iter()
                .find(|load| {
                    load.url.contains(fragment) || load.normalized_url.contains(fragment)
                })
                .map(|load| FailureEvent {
                    unit_id: load.unit_id.clone(),
                    tag: Some(load.tag.clone()),
                })
        };
        match event {
            Some(event) => self.failures_tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Push an arbitrary failure event, e.g. one with no tag.
    pub fn emit_failure(&self, unit_id: UnitId, tag: Option<CorrelationTag>) {
        let _ = self.failures_tx.send(FailureEvent { unit_id, tag });
    }

    pub fn issued_count(&self) -> usize {
        self.inner.lock().issued.len()
    }

    pub fn issued_urls(&self) -> Vec<String> {
        self.inner
            .lock()
            .issued
            .iter()
            .map(|load| load.url.clone())
            .collect()
    }

    pub fn unit_id_for(&self, fragment: &str) -> Option<UnitId> {
        self.inner
            .lock()
            .issued
            .iter()
            .find(|load| {
                load.url.contains(fragment) || load.normalized_url.contains(fragment)
            })
            .map(|load| load.unit_id.clone())
    }

    pub fn removed_ids(&self) -> Vec<UnitId> {
        self.inner.lock().removed.clone()
    }

    pub fn adopted(&self) -> Vec<(String, UnitId)> {
        self.inner.lock().adopted.clone()
    }
}

impl Environment for MockEnvironment {
    fn issue_load(
        &self,
        descriptor: &ResourceDescriptor,
        tag: &CorrelationTag,
        unit_id: &UnitId,
    ) -> EnvironmentResult<LoadTicket> {
        let (success, loaded) = oneshot::channel();
        self.inner.lock().issued.push(IssuedLoad {
            url: descriptor.url().to_string(),
            normalized_url: descriptor.normalized_url().to_string(),
            unit_id: unit_id.clone(),
            tag: tag.clone(),
            success: Some(success),
        });
        Ok(LoadTicket { loaded })
    }

    fn take_failure_events(
        &self,
    ) -> EnvironmentResult<mpsc::UnboundedReceiver<FailureEvent>> {
        self.failures_rx
            .lock()
            .take()
            .ok_or(EnvironmentError::FailureChannelTaken)
    }

    fn scan_existing(&self) -> Vec<ExistingResource> {
        self.inner.lock().existing.clone()
    }

    fn adopt_existing(&self, url: &str, id: &UnitId) {
        let mut inner = self.inner.lock();
        inner.adopted.push((url.to_string(), id.clone()));
        if let Some(existing) = inner.existing.iter_mut().find(|e| e.url == url) {
            existing.existing_id = Some(id.clone());
        }
    }

    fn remove_resource(&self, id: &UnitId) {
        let mut inner = self.inner.lock();
        inner.removed.push(id.clone());
        inner.existing.retain(|existing| {
            existing.existing_id.as_ref() != Some(id)
        });
    }

    fn assign_id(&self, length: usize) -> UnitId {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let id = format!("ld_{:0width$}", inner.counter, width = length.saturating_sub(3));
        UnitId::new(id)
    }

    fn base(&self) -> NormalizerConfig {
        self.base.clone()
    }
}

/// Let every ready task (watchers, router, drivers) run to completion.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_ids_are_unique_and_padded() {
        let env = MockEnvironment::new();
        let a = env.assign_id(8);
        let b = env.assign_id(8);
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 8);
    }

    #[tokio::test]
    async fn test_complete_fires_ticket_once() {
        let env = MockEnvironment::new();
        let cfg = env.base();
        let descriptor = ResourceDescriptor::new("a.js", &cfg);
        let ticket = env
            .issue_load(&descriptor, &CorrelationTag::new("x", 0), &UnitId::new("u1"))
            .unwrap();

        assert!(env.complete("a.js"));
        assert!(ticket.loaded.await.is_ok());
        assert!(!env.complete("a.js"));
    }

    #[test]
    fn test_remove_resource_drops_existing_entry() {
        let env = MockEnvironment::new();
        env.add_existing("a.js", Some(UnitId::new("pre_a")));
        env.remove_resource(&UnitId::new("pre_a"));
        assert!(env.scan_existing().is_empty());
        assert_eq!(env.removed_ids(), vec![UnitId::new("pre_a")]);
    }
}
