// ── View lifecycle ──
//
// Drives one view from activation to disposal:
//
//   Idle -> WaitingForConnection -> Loading -> Ready
//
// The live update subscription starts alongside WaitingForConnection so
// no update published during discovery is missed. The connection gate
// opens at most once; later reloads keep the view in `Ready`.

use std::sync::Arc;
use std::time::Duration;

use qsync_api::{ComponentDirectory, ControlGateway};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ViewConfig;
use crate::error::CoreError;
use crate::merger::spawn_merger;
use crate::selection::{EntityPostProcessor, SelectionEngine};
use crate::store::SnapshotStore;
use crate::stream::{EntityStream, Snapshot};

// ── LifecycleState ───────────────────────────────────────────────

/// Observable state of a view.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum LifecycleState {
    #[strum(to_string = "idle")]
    Idle,
    #[strum(to_string = "waiting for connection")]
    WaitingForConnection,
    #[strum(to_string = "loading")]
    Loading,
    #[strum(to_string = "ready")]
    Ready,
    /// The first resolve could not read the component directory.
    #[strum(to_string = "failed: {message}")]
    Failed { message: String },
}

impl LifecycleState {
    /// `Ready` or `Failed`: the initial load has finished one way or
    /// the other.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed { .. })
    }
}

// ── ViewController ───────────────────────────────────────────────

/// Builder for one view. Consumed by [`activate`](Self::activate).
pub struct ViewController {
    gateway: Arc<dyn ControlGateway>,
    engine: SelectionEngine,
    config: ViewConfig,
}

impl ViewController {
    pub fn new(
        gateway: Arc<dyn ControlGateway>,
        directory: Arc<dyn ComponentDirectory>,
        config: ViewConfig,
    ) -> Self {
        let engine = SelectionEngine::new(Arc::clone(&gateway), directory)
            .with_fetch_concurrency(config.fetch_concurrency);
        Self {
            gateway,
            engine,
            config,
        }
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn EntityPostProcessor>) -> Self {
        self.engine = self.engine.with_post_processor(processor);
        self
    }

    /// Start the view with its own cancellation token.
    pub fn activate(self) -> ViewHandle {
        self.activate_with_token(CancellationToken::new())
    }

    /// Start the view. Cancelling `cancel` (or disposing the returned
    /// handle) stops every task the view owns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate_with_token(self, cancel: CancellationToken) -> ViewHandle {
        let (state, _) = watch::channel(LifecycleState::Idle);
        let shared = Arc::new(ViewShared {
            engine: self.engine,
            config: self.config,
            store: Arc::new(SnapshotStore::new()),
            state,
            reload_lock: Mutex::new(()),
        });

        shared.set_state(LifecycleState::WaitingForConnection);

        // Both subscriptions are taken here, synchronously, before any
        // task runs.
        let updates = self.gateway.control_updates();
        let connectivity = self.gateway.connection_status();

        let merger = spawn_merger(Arc::clone(&shared.store), updates, cancel.clone());
        let loader = tokio::spawn(view_task(Arc::clone(&shared), connectivity, cancel.clone()));

        ViewHandle {
            shared,
            cancel,
            tasks: vec![merger, loader],
        }
    }
}

// ── Shared view state ────────────────────────────────────────────

struct ViewShared {
    engine: SelectionEngine,
    config: ViewConfig,
    store: Arc<SnapshotStore>,
    state: watch::Sender<LifecycleState>,
    /// Held for the duration of every resolve; two never overlap.
    reload_lock: Mutex<()>,
}

impl ViewShared {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn set_state(&self, next: LifecycleState) {
        debug!(view = %self.name(), state = %next, "view state");
        self.state.send_replace(next);
    }

    fn gate_passed(&self) -> bool {
        !matches!(
            *self.state.borrow(),
            LifecycleState::Idle | LifecycleState::WaitingForConnection
        )
    }

    /// Resolve the view's directives and replace the store.
    async fn load(&self) -> Result<usize, CoreError> {
        let _guard = self.reload_lock.lock().await;

        match self.engine.resolve(&self.config.directives).await {
            Ok(entities) => {
                let count = entities.len();
                self.store.replace_all(entities);
                self.set_state(LifecycleState::Ready);
                info!(view = %self.name(), count, "view loaded");
                Ok(count)
            }
            Err(e) => {
                let was_ready = matches!(*self.state.borrow(), LifecycleState::Ready);
                if was_ready {
                    warn!(view = %self.name(), error = %e, "reload failed, keeping previous entities");
                } else {
                    error!(view = %self.name(), error = %e, "view failed to load");
                    self.set_state(LifecycleState::Failed {
                        message: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }
}

// ── Background task ──────────────────────────────────────────────

async fn view_task(
    shared: Arc<ViewShared>,
    mut connectivity: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    // One-shot connection gate.
    let gate = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = connectivity.wait_for(|connected| *connected) => opened.map(|_| ()),
    };
    if gate.is_err() {
        warn!(view = %shared.name(), "connectivity signal closed before first connection");
        return;
    }

    let reload_on_reconnect = shared.config.reload_on_reconnect;
    let mut watching = reload_on_reconnect;
    // The gate consumed the `true` that opened it; edges are tracked from here,
    // including those that land while the first load is in flight.
    let mut was_connected = true;
    let mut recovered_while_loading = false;

    shared.set_state(LifecycleState::Loading);
    {
        let load = shared.load();
        tokio::pin!(load);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = &mut load => break,
                changed = connectivity.changed(), if watching => {
                    if changed.is_err() {
                        debug!(view = %shared.name(), "connectivity signal closed");
                        watching = false;
                        continue;
                    }
                    let connected = *connectivity.borrow_and_update();
                    if connected && !was_connected {
                        recovered_while_loading = true;
                    }
                    was_connected = connected;
                }
            }
        }
    }

    if recovered_while_loading {
        info!(view = %shared.name(), "connectivity recovered during first load, reloading view");
        reload_or_cancel(&shared, &cancel).await;
    }

    let mut refresh = shared.config.refresh_interval.map(refresh_interval);
    if !reload_on_reconnect && refresh.is_none() {
        debug!(view = %shared.name(), "no reload triggers configured");
        cancel.cancelled().await;
        return;
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = connectivity.changed(), if watching => {
                if changed.is_err() {
                    debug!(view = %shared.name(), "connectivity signal closed");
                    watching = false;
                    continue;
                }
                let connected = *connectivity.borrow_and_update();
                if connected && !was_connected {
                    info!(view = %shared.name(), "connectivity recovered, reloading view");
                    reload_or_cancel(&shared, &cancel).await;
                }
                was_connected = connected;
            }
            () = next_tick(refresh.as_mut()) => {
                debug!(view = %shared.name(), "periodic reload");
                reload_or_cancel(&shared, &cancel).await;
            }
        }
    }
}

async fn reload_or_cancel(shared: &ViewShared, cancel: &CancellationToken) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {}
        _ = shared.load() => {}
    }
}

fn refresh_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ── ViewHandle ───────────────────────────────────────────────────

/// Disposer for an active view.
///
/// Dropping the handle (or calling [`dispose`](Self::dispose)) releases
/// the connectivity wait and the live update subscription.
pub struct ViewHandle {
    shared: Arc<ViewShared>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ViewHandle {
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn config(&self) -> &ViewConfig {
        &self.shared.config
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state.borrow().clone()
    }

    pub fn state_changes(&self) -> watch::Receiver<LifecycleState> {
        self.shared.state.subscribe()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.shared.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.store.snapshot()
    }

    pub fn subscribe(&self) -> EntityStream {
        self.shared.store.subscribe()
    }

    /// Wait until the initial load has finished.
    ///
    /// Returns the entity count, or the load failure.
    pub async fn wait_until_settled(&self) -> Result<usize, CoreError> {
        let mut states = self.shared.state.subscribe();
        let settled = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(self.disposed_error()),
            state = states.wait_for(LifecycleState::is_settled) => state
                .map(|state| state.clone())
                .map_err(|_| CoreError::Internal("view state channel closed".into()))?,
        };

        match settled {
            LifecycleState::Failed { message } => Err(CoreError::DirectoryUnavailable { message }),
            _ => Ok(self.shared.store.len()),
        }
    }

    /// Resolve again and replace the store.
    ///
    /// Refused until the connection gate has opened, so no resolve ever
    /// runs before the first connection.
    pub async fn reload(&self) -> Result<usize, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(self.disposed_error());
        }
        if !self.shared.gate_passed() {
            return Err(CoreError::Disconnected);
        }
        self.shared.load().await
    }

    fn disposed_error(&self) -> CoreError {
        CoreError::Internal(format!("view '{}' has been disposed", self.name()))
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop every task the view owns.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            debug!(view = %self.name(), "disposing view");
        }
        self.cancel.cancel();
    }

    /// Dispose and wait for the view's tasks to finish.
    pub async fn shutdown(mut self) {
        self.dispose();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
