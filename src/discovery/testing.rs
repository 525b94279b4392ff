//! In-memory orchestrator for discovery tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::discovery::orchestrator::{
    DiscoveryError, EventKind, EventStream, InstanceDescriptor, InstanceDetails, LifecycleEvent,
    Orchestrator, OrchestratorSession,
};

type EventSender = mpsc::UnboundedSender<Result<LifecycleEvent, DiscoveryError>>;

#[derive(Default)]
struct FakeState {
    instances: Mutex<Vec<InstanceDescriptor>>,
    details: Mutex<HashMap<String, InstanceDetails>>,
    subscribers: Mutex<Vec<EventSender>>,
    connect_failures: AtomicU32,
    list_failures: AtomicU32,
    subscribe_failures: AtomicU32,
    connects: AtomicU32,
    subscriptions: AtomicU32,
}

/// Scriptable orchestrator; clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeOrchestrator {
    state: Arc<FakeState>,
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl FakeOrchestrator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_instance(&self, id: &str, image: &str, address: Option<&str>, ports: &[u16]) {
        self.state.instances.lock().unwrap().push(InstanceDescriptor {
            id: id.to_string(),
            name: format!("/{}", id),
            image: image.to_string(),
        });
        self.state.details.lock().unwrap().insert(
            id.to_string(),
            InstanceDetails {
                address: address.map(str::to_string),
                exposed_ports: ports.to_vec(),
            },
        );
    }

    /// Keep the instance listed but make `inspect` fail for it.
    pub(crate) fn remove_details(&self, id: &str) {
        self.state.details.lock().unwrap().remove(id);
    }

    pub(crate) fn clear_instances(&self) {
        self.state.instances.lock().unwrap().clear();
        self.state.details.lock().unwrap().clear();
    }

    pub(crate) fn fail_next_connects(&self, n: u32) {
        self.state.connect_failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_lists(&self, n: u32) {
        self.state.list_failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_subscribes(&self, n: u32) {
        self.state.subscribe_failures.store(n, Ordering::SeqCst);
    }

    /// Deliver an event to every open subscription.
    pub(crate) fn emit(&self, kind: EventKind, instance_id: &str) {
        let event = LifecycleEvent {
            kind,
            instance_id: instance_id.to_string(),
        };
        self.state
            .subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(Ok(event.clone())).is_ok());
    }

    /// Terminate every open subscription with an error.
    pub(crate) fn break_streams(&self) {
        for tx in self.state.subscribers.lock().unwrap().drain(..) {
            let _ = tx.send(Err(DiscoveryError::Stream("connection reset".into())));
        }
    }

    /// Close every open subscription cleanly.
    pub(crate) fn end_streams(&self) {
        self.state.subscribers.lock().unwrap().clear();
    }

    pub(crate) fn connects(&self) -> u32 {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriptions(&self) -> u32 {
        self.state.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn connect(&self) -> Result<Box<dyn OrchestratorSession>, DiscoveryError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.connect_failures) {
            return Err(DiscoveryError::Connect("daemon unavailable".into()));
        }
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<FakeState>,
}

#[async_trait]
impl OrchestratorSession for FakeSession {
    async fn list_instances(&self, _label: &str) -> Result<Vec<InstanceDescriptor>, DiscoveryError> {
        if take_failure(&self.state.list_failures) {
            return Err(DiscoveryError::Request("list failed".into()));
        }
        Ok(self.state.instances.lock().unwrap().clone())
    }

    async fn inspect(&self, id: &str) -> Result<InstanceDetails, DiscoveryError> {
        self.state
            .details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| DiscoveryError::Request(format!("no such container: {}", id)))
    }

    async fn subscribe_events(&self, _label: &str) -> Result<EventStream, DiscoveryError> {
        if take_failure(&self.state.subscribe_failures) {
            return Err(DiscoveryError::Stream("subscribe refused".into()));
        }
        self.state.subscriptions.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        self.state.subscribers.lock().unwrap().push(tx);
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
    }
}
