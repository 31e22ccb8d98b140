// ── Controller ──
//
// Owns the session with one core and hands out the pieces views need:
// gateway, directory, writer and per-view lifecycle handles.

use std::sync::Arc;

use qsync_api::{ComponentDirectory, ComponentInfo, ControlGateway, QrcClient};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ControllerConfig, ViewConfig};
use crate::error::CoreError;
use crate::lifecycle::{ViewController, ViewHandle};
use crate::writer::ControlWriter;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    #[strum(to_string = "disconnected")]
    Disconnected,
    #[strum(to_string = "connecting")]
    Connecting,
    #[strum(to_string = "connected")]
    Connected,
    #[strum(to_string = "reconnecting")]
    Reconnecting,
    #[strum(to_string = "failed")]
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. `new()` does not touch
/// the network; call [`connect()`](Self::connect) to start the session.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Child token for the current session. Cancelled on disconnect,
    /// replaced on the next connect.
    cancel_child: Mutex<CancellationToken>,
    client: Mutex<Option<QrcClient>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                connection_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                client: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Start the session.
    ///
    /// Unless `wait_for_connection` is off, waits up to `connect_timeout`
    /// for the first successful connection.
    ///
    /// Calling it again replaces the running session: the previous client
    /// is shut down and views opened through it are stopped first.
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.end_session().await {
            debug!("replacing existing session");
        }
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        let client = QrcClient::connect(config.url.clone(), config.qrc_config(), child.clone())
            .inspect_err(|_| {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
            })?;

        let status = client.connection_status();
        *self.inner.client.lock().await = Some(client.clone());
        self.inner.task_handles.lock().await.push(tokio::spawn(
            connection_state_task(
                status.clone(),
                self.inner.connection_state.clone(),
                child.clone(),
            ),
        ));

        if config.wait_for_connection {
            let mut status = status;
            let opened = tokio::time::timeout(config.connect_timeout, status.wait_for(|c| *c))
                .await
                .map(|r| r.is_ok());
            if !matches!(opened, Ok(true)) {
                warn!(url = %config.url, "core did not become reachable in time");
                self.disconnect().await;
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(CoreError::ConnectionFailed {
                    url: config.url.to_string(),
                    reason: format!(
                        "no session within {}s",
                        config.connect_timeout.as_secs()
                    ),
                });
            }
            self.inner
                .connection_state
                .send_replace(ConnectionState::Connected);
            info!(url = %config.url, "connected to core");
        } else {
            debug!(url = %config.url, "session started, not waiting for connectivity");
        }

        Ok(())
    }

    /// Stop the session and every view opened through this controller.
    pub async fn disconnect(&self) {
        self.end_session().await;
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Cancel the current child token, shut the client down and join the
    /// session's background tasks. Returns whether a client was running.
    async fn end_session(&self) -> bool {
        // Cancel the child token (not the parent, which allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        let client = self.inner.client.lock().await.take();
        let had_client = client.is_some();
        if let Some(client) = client {
            client.shutdown();
        }

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        had_client
    }

    /// One-shot: connect, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    // ── Collaborators ────────────────────────────────────────────

    async fn client(&self) -> Result<QrcClient, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::Disconnected)
    }

    pub async fn gateway(&self) -> Result<Arc<dyn ControlGateway>, CoreError> {
        let gateway: Arc<dyn ControlGateway> = Arc::new(self.client().await?);
        Ok(gateway)
    }

    pub async fn directory(&self) -> Result<Arc<dyn ComponentDirectory>, CoreError> {
        let directory: Arc<dyn ComponentDirectory> = Arc::new(self.client().await?);
        Ok(directory)
    }

    /// The cached component list.
    pub async fn components(&self) -> Result<Arc<Vec<ComponentInfo>>, CoreError> {
        Ok(self.client().await?.components()?)
    }

    pub async fn writer(&self) -> Result<ControlWriter, CoreError> {
        Ok(ControlWriter::new(self.gateway().await?))
    }

    /// Activate a view bound to the current session.
    ///
    /// The view is disposed automatically on [`disconnect()`](Self::disconnect).
    pub async fn open_view(&self, config: ViewConfig) -> Result<ViewHandle, CoreError> {
        let client = self.client().await?;
        let cancel = self.inner.cancel_child.lock().await.child_token();
        debug!(view = %config.name, directives = config.directives.len(), "opening view");

        Ok(
            ViewController::new(Arc::new(client.clone()), Arc::new(client), config)
                .activate_with_token(cancel),
        )
    }
}

/// Mirror the session's connectivity flag into `ConnectionState`.
async fn connection_state_task(
    mut status: watch::Receiver<bool>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let mut ever_connected = false;
    loop {
        let connected = *status.borrow_and_update();
        let next = match (connected, ever_connected) {
            (true, _) => ConnectionState::Connected,
            (false, true) => ConnectionState::Reconnecting,
            (false, false) => ConnectionState::Connecting,
        };
        ever_connected |= connected;
        state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
