//! QRC session over WebSocket with auto-reconnect.
//!
//! Speaks JSON-RPC 2.0 to a control core. Requests are correlated by id,
//! change-group polls are fanned out through a [`tokio::sync::broadcast`]
//! channel, and the component directory is refreshed on every (re)connect.
//! Reconnection uses exponential backoff + jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use qsync_api::{ControlGateway, QrcClient, QrcConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("ws://192.168.1.50/qrc")?;
//!
//! let client = QrcClient::connect(url, QrcConfig::default(), cancel.clone())?;
//! let mut updates = client.control_updates();
//! let controls = client.component_controls("Lobby").await?;
//!
//! while let Ok(update) = updates.recv().await {
//!     println!("{}:{} -> {:?}", update.component, update.control, update.value);
//! }
//!
//! client.shutdown();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::gateway::{ComponentDirectory, ControlGateway};
use crate::rpc::{self, ComponentControls, Incoming};
use crate::types::{ComponentInfo, Control, ControlUpdate};

// ── Broadcast channel capacity ───────────────────────────────────────

const UPDATE_CHANNEL_CAPACITY: usize = 1024;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── QrcConfig ────────────────────────────────────────────────────────

/// Session tuning for [`QrcClient`].
#[derive(Debug, Clone)]
pub struct QrcConfig {
    pub reconnect: ReconnectConfig,
    /// How long a single request may wait for its response. Default: 10s.
    pub request_timeout: Duration,
    /// Change-group auto-poll rate. Default: 200ms.
    pub poll_rate: Duration,
    /// Interval between `NoOp` keep-alives. Default: 30s.
    pub keepalive: Duration,
}

impl Default for QrcConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            request_timeout: Duration::from_secs(10),
            poll_rate: Duration::from_millis(200),
            keepalive: Duration::from_secs(30),
        }
    }
}

// ── QrcClient ────────────────────────────────────────────────────────

/// Handle to a running QRC session.
///
/// Cheaply cloneable. Implements both [`ControlGateway`] and
/// [`ComponentDirectory`]. Call [`shutdown`](Self::shutdown) (or cancel the
/// token passed to [`connect`](Self::connect)) to tear down the background
/// task.
#[derive(Clone)]
pub struct QrcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: Url,
    config: QrcConfig,
    /// Change group owned by this client; unique so several clients can
    /// share one core.
    group_id: String,
    next_id: AtomicU64,
    pending: DashMap<u64, oneshot::Sender<Result<Value, Error>>>,
    /// Sender into the live socket's write half. `None` while disconnected.
    outbound: ArcSwapOption<mpsc::UnboundedSender<String>>,
    update_tx: broadcast::Sender<Arc<ControlUpdate>>,
    connected: watch::Sender<bool>,
    directory: ArcSwapOption<Vec<ComponentInfo>>,
    /// Controls registered into the change group, replayed on reconnect.
    registered: DashMap<String, Vec<String>>,
    cancel: CancellationToken,
}

impl QrcClient {
    /// Validate the URL and spawn the reconnection loop.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Watch [`connection_status`](ControlGateway::connection_status)
    /// to learn when the session is ready.
    pub fn connect(url: Url, config: QrcConfig, cancel: CancellationToken) -> Result<Self, Error> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::WebSocketConnect(format!(
                "unsupported URL scheme '{}' (expected ws or wss)",
                url.scheme()
            )));
        }

        let client = Self::build(url, config, cancel);
        let task_client = client.clone();
        tokio::spawn(async move {
            ws_loop(task_client).await;
        });

        Ok(client)
    }

    fn build(url: Url, config: QrcConfig, cancel: CancellationToken) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (connected, _) = watch::channel(false);

        Self {
            inner: Arc::new(ClientInner {
                url,
                config,
                group_id: format!("qsync-{}", uuid::Uuid::new_v4().simple()),
                next_id: AtomicU64::new(1),
                pending: DashMap::new(),
                outbound: ArcSwapOption::empty(),
                update_tx,
                connected,
                directory: ArcSwapOption::empty(),
                registered: DashMap::new(),
                cancel,
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn group_id(&self) -> &str {
        &self.inner.group_id
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    /// Re-fetch the component directory now.
    pub async fn refresh_directory(&self) -> Result<Arc<Vec<ComponentInfo>>, Error> {
        let components = Arc::new(rpc::parse_components(
            self.call(rpc::GET_COMPONENTS, json!({})).await?,
        )?);
        self.inner.directory.store(Some(Arc::clone(&components)));
        tracing::debug!(count = components.len(), "component directory refreshed");
        Ok(components)
    }

    // ── Request/response ─────────────────────────────────────────

    /// Send one JSON-RPC request and await its result.
    async fn call(&self, method: &str, params: Value) -> Result<Value, Error> {
        let Some(outbound) = self.inner.outbound.load_full() else {
            return Err(Error::NotConnected);
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = rpc::encode_request(id, method, &params)?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(id, tx);

        if outbound.send(frame).is_err() {
            self.inner.pending.remove(&id);
            return Err(Error::NotConnected);
        }
        tracing::trace!(id, method, "request sent");

        match tokio::time::timeout(self.inner.config.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => {
                self.inner.pending.remove(&id);
                Err(Error::Timeout {
                    timeout_secs: self.inner.config.request_timeout.as_secs(),
                })
            }
        }
    }

    async fn register_controls(&self, component: &str, controls: &[String]) -> Result<(), Error> {
        let params =
            rpc::add_component_controls_params(&self.inner.group_id, component, controls);
        self.call(rpc::CHANGE_GROUP_ADD_COMPONENT, params)
            .await
            .map(|_| ())
    }

    // ── Session hooks ────────────────────────────────────────────

    /// Runs once per established socket: reload the directory, flag the
    /// session as connected, then restore the change group.
    ///
    /// A failed directory load is returned before connectivity is
    /// published; the caller drops the socket and the reconnect loop
    /// tries again.
    async fn resync(&self) -> Result<(), Error> {
        if let Err(e) = self.refresh_directory().await {
            tracing::warn!(error = %e, "component directory refresh failed");
            return Err(e);
        }
        self.inner.connected.send_replace(true);
        tracing::info!(url = %self.inner.url, "session ready");

        let registered: Vec<(String, Vec<String>)> = self
            .inner
            .registered
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (component, controls) in registered {
            if let Err(e) = self.register_controls(&component, &controls).await {
                tracing::warn!(component = %component, error = %e, "change group re-registration failed");
            }
        }

        let params = rpc::auto_poll_params(
            &self.inner.group_id,
            self.inner.config.poll_rate.as_secs_f64(),
        );
        if let Err(e) = self.call(rpc::CHANGE_GROUP_AUTO_POLL, params).await {
            tracing::warn!(error = %e, "change group auto-poll setup failed");
        }
        Ok(())
    }

    /// Runs when a socket goes away: stop accepting requests, fail the
    /// in-flight ones, and publish the disconnect.
    fn teardown_session(&self) {
        self.inner.outbound.store(None);
        self.inner.connected.send_replace(false);

        let ids: Vec<u64> = self.inner.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.inner.pending.remove(&id) {
                let _ = tx.send(Err(Error::NotConnected));
            }
        }
    }

    /// Route one incoming text frame.
    fn handle_frame(&self, text: &str) {
        match rpc::decode(text) {
            Ok(Incoming::Response { id, result }) => {
                if let Ok(ref value) = result {
                    if let Some(poll) = rpc::poll_from_result(value, &self.inner.group_id) {
                        self.broadcast_changes(poll.updates());
                    }
                }
                match self.inner.pending.remove(&id) {
                    Some((_, tx)) => {
                        let _ = tx.send(result);
                    }
                    None => tracing::trace!(id, "response without a pending request"),
                }
            }
            Ok(Incoming::Poll(poll)) => {
                if poll.id == self.inner.group_id {
                    self.broadcast_changes(poll.updates());
                } else {
                    tracing::debug!(group = %poll.id, "poll for a foreign change group");
                }
            }
            Ok(Incoming::Notification { method, .. }) => {
                tracing::debug!(method = %method, "notification");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to decode frame");
            }
        }
    }

    fn broadcast_changes(&self, changes: Vec<ControlUpdate>) {
        for change in changes {
            // Ignore send errors -- just means no active subscribers right now
            let _ = self.inner.update_tx.send(Arc::new(change));
        }
    }
}

// ── Gateway implementation ───────────────────────────────────────────

#[async_trait]
impl ControlGateway for QrcClient {
    async fn component_controls(&self, component: &str) -> Result<Vec<Control>, Error> {
        let value = self
            .call(rpc::GET_CONTROLS, rpc::get_controls_params(component))
            .await?;
        let parsed: ComponentControls = rpc::parse_result(value)?;

        let names: Vec<String> = parsed
            .controls
            .iter()
            .filter(|c| !c.name.is_empty())
            .map(|c| c.name.clone())
            .collect();
        if !names.is_empty() {
            self.inner
                .registered
                .insert(component.to_owned(), names.clone());
            if let Err(e) = self.register_controls(component, &names).await {
                tracing::warn!(component = %component, error = %e, "change group registration failed");
            }
        }

        Ok(parsed.controls)
    }

    fn control_updates(&self) -> broadcast::Receiver<Arc<ControlUpdate>> {
        self.inner.update_tx.subscribe()
    }

    async fn set_control(
        &self,
        component: &str,
        control: &str,
        value: f64,
    ) -> Result<(), Error> {
        self.call(
            rpc::COMPONENT_SET,
            rpc::set_value_params(component, control, value),
        )
        .await
        .map(|_| ())
    }

    async fn set_control_position(
        &self,
        component: &str,
        control: &str,
        position: f64,
    ) -> Result<(), Error> {
        self.call(
            rpc::COMPONENT_SET,
            rpc::set_position_params(component, control, position),
        )
        .await
        .map(|_| ())
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }
}

impl ComponentDirectory for QrcClient {
    fn components(&self) -> Result<Arc<Vec<ComponentInfo>>, Error> {
        self.inner
            .directory
            .load_full()
            .ok_or(Error::DirectoryUnavailable)
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → serve → on drop, backoff → reconnect.
async fn ws_loop(client: QrcClient) {
    let cancel = client.inner.cancel.clone();
    let reconnect = client.inner.config.reconnect.clone();
    let mut attempt: u32 = 0;

    loop {
        let delay = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_serve(&client) => {
                match result {
                    // Clean disconnect: reset the attempt counter.
                    Ok(()) => {
                        tracing::info!("WebSocket disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "WebSocket error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "WebSocket reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }
                        attempt += 1;
                    }
                }
                calculate_backoff(attempt.saturating_sub(1), &reconnect)
            }
        };

        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    client.teardown_session();
    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and serve it until it drops.
async fn connect_and_serve(client: &QrcClient) -> Result<(), Error> {
    let inner = &client.inner;
    tracing::info!(url = %inner.url, "Connecting to core");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(inner.url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("WebSocket connected");

    let (mut write, mut read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    inner.outbound.store(Some(Arc::new(out_tx)));

    // Resync needs the read loop below to deliver its responses.
    let session = client.clone();
    let mut resync = tokio::spawn(async move { session.resync().await });
    let mut resynced = false;

    let mut keepalive = tokio::time::interval(inner.config.keepalive.max(Duration::from_secs(1)));
    keepalive.tick().await; // consume the immediate first tick

    let result = loop {
        tokio::select! {
            biased;
            () = inner.cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break Ok(());
            }
            done = &mut resync, if !resynced => {
                resynced = true;
                match done {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        let _ = write.send(Message::Close(None)).await;
                        break Err(e);
                    }
                    Err(e) => break Err(Error::WebSocketConnect(format!("session setup aborted: {e}"))),
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => client.handle_frame(text.as_str()),
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("WebSocket stream ended");
                        break Ok(());
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
            outgoing = out_rx.recv() => {
                let Some(frame) = outgoing else { break Ok(()) };
                if let Err(e) = write.send(Message::text(frame)).await {
                    break Err(Error::WebSocketConnect(e.to_string()));
                }
            }
            _ = keepalive.tick() => {
                let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
                match rpc::encode_request(id, rpc::NO_OP, &json!({})) {
                    Ok(frame) => {
                        if let Err(e) = write.send(Message::text(frame)).await {
                            break Err(Error::WebSocketConnect(e.to_string()));
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "keep-alive encoding failed"),
                }
            }
        }
    };

    resync.abort();
    client.teardown_session();
    result
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25%, deterministic in the attempt number.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
