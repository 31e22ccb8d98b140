// Shared fakes for the core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use qsync_api::{ComponentDirectory, ComponentInfo, Control, ControlGateway, ControlUpdate, Error};
use tokio::sync::{broadcast, watch};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Value(String, String, f64),
    Position(String, String, f64),
}

/// In-memory gateway: fixed controls per component, scripted failures,
/// and a recorder for fetches and writes.
pub struct MockGateway {
    controls: HashMap<String, Vec<Control>>,
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    fail_writes: bool,
    pub fetches: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<Write>>,
    pub updates: broadcast::Sender<Arc<ControlUpdate>>,
    pub connected: watch::Sender<bool>,
}

impl MockGateway {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        let (connected, _) = watch::channel(false);
        Self {
            controls: HashMap::new(),
            failing: Vec::new(),
            delays: HashMap::new(),
            fail_writes: false,
            fetches: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            updates,
            connected,
        }
    }

    pub fn with_component(mut self, component: &str, controls: Vec<Control>) -> Self {
        self.controls.insert(component.to_owned(), controls);
        self
    }

    pub fn with_failing(mut self, component: &str) -> Self {
        self.failing.push(component.to_owned());
        self
    }

    pub fn with_delay(mut self, component: &str, delay: Duration) -> Self {
        self.delays.insert(component.to_owned(), delay);
        self
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn connected(self) -> Self {
        self.connected.send_replace(true);
        self
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    pub fn push(&self, update: ControlUpdate) {
        let _ = self.updates.send(Arc::new(update));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn recorded_writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlGateway for MockGateway {
    async fn component_controls(&self, component: &str) -> Result<Vec<Control>, Error> {
        self.fetches.lock().unwrap().push(component.to_owned());
        if let Some(delay) = self.delays.get(component) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|c| c == component) {
            return Err(Error::Timeout { timeout_secs: 10 });
        }
        self.controls.get(component).cloned().ok_or_else(|| Error::Rpc {
            code: 8,
            message: format!("Unknown component {component}"),
        })
    }

    fn control_updates(&self) -> broadcast::Receiver<Arc<ControlUpdate>> {
        self.updates.subscribe()
    }

    async fn set_control(&self, component: &str, control: &str, value: f64) -> Result<(), Error> {
        self.writes
            .lock()
            .unwrap()
            .push(Write::Value(component.into(), control.into(), value));
        if self.fail_writes {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn set_control_position(
        &self,
        component: &str,
        control: &str,
        position: f64,
    ) -> Result<(), Error> {
        self.writes
            .lock()
            .unwrap()
            .push(Write::Position(component.into(), control.into(), position));
        if self.fail_writes {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

/// Directory whose reads can be made to fail, counting every read.
pub struct MockDirectory {
    components: Vec<ComponentInfo>,
    fail: bool,
    reads: AtomicUsize,
}

impl MockDirectory {
    pub fn new(components: Vec<ComponentInfo>) -> Self {
        Self {
            components,
            fail: false,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            components: Vec::new(),
            fail: true,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ComponentDirectory for MockDirectory {
    fn components(&self) -> Result<Arc<Vec<ComponentInfo>>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::DirectoryUnavailable);
        }
        Ok(Arc::new(self.components.clone()))
    }
}

pub fn control(name: &str, control_type: &str, value: f64) -> Control {
    Control {
        name: name.into(),
        control_type: control_type.into(),
        value: Some(value),
        position: Some(0.5),
        string: Some(format!("{value}")),
    }
}

/// A small room: two lights, a gain block with an unnamed control, and a
/// component that always fails to load.
pub fn room() -> (MockGateway, MockDirectory) {
    let gateway = MockGateway::new()
        .with_component(
            "MainLight",
            vec![control("level", "Float", 0.8), control("power", "Boolean", 1.0)],
        )
        .with_component(
            "StageLight",
            vec![control("level", "Float", 0.2), control("power", "Boolean", 0.0)],
        )
        .with_component(
            "Lobby",
            vec![
                control("gain", "Float", -12.0),
                control("mute", "Boolean", 0.0),
                control("", "Float", 0.0),
            ],
        )
        .with_failing("Broken");

    let directory = MockDirectory::new(vec![
        ComponentInfo::new("MainLight", "dimmer"),
        ComponentInfo::new("Broken", "dimmer"),
        ComponentInfo::new("Lobby", "gain"),
        ComponentInfo::new("StageLight", "dimmer"),
    ]);

    (gateway, directory)
}

pub fn keys(entities: &[qsync_core::Entity]) -> Vec<String> {
    entities.iter().map(|e| e.key().to_string()).collect()
}

pub fn snapshot_keys(snapshot: &qsync_core::Snapshot) -> Vec<String> {
    snapshot.iter().map(|e| e.key().to_string()).collect()
}
