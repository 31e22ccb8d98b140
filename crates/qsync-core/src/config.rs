// ── Runtime configuration ──
//
// These types describe how to reach a core and how each view behaves.
// They never touch disk: the CLI (via `qsync-config`) builds them and
// hands them in.

use std::time::Duration;

use qsync_api::{QrcConfig, ReconnectConfig};
use url::Url;

use crate::selection::SelectionDirective;

/// Configuration for connecting to a single core.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// WebSocket endpoint, e.g. `ws://192.168.1.50/qrc`.
    pub url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long [`Controller::connect`](crate::Controller::connect) waits
    /// for the first successful session.
    pub connect_timeout: Duration,
    /// Whether `connect()` waits for connectivity at all. When `false`
    /// it returns as soon as the session task is spawned.
    pub wait_for_connection: bool,
    pub reconnect: ReconnectConfig,
    /// Change-group auto-poll rate.
    pub poll_rate: Duration,
    pub keepalive: Duration,
}

impl ControllerConfig {
    pub fn new(url: Url) -> Self {
        let qrc = QrcConfig::default();
        Self {
            url,
            timeout: qrc.request_timeout,
            connect_timeout: Duration::from_secs(10),
            wait_for_connection: true,
            reconnect: qrc.reconnect,
            poll_rate: qrc.poll_rate,
            keepalive: qrc.keepalive,
        }
    }

    pub(crate) fn qrc_config(&self) -> QrcConfig {
        QrcConfig {
            reconnect: self.reconnect.clone(),
            request_timeout: self.timeout,
            poll_rate: self.poll_rate,
            keepalive: self.keepalive,
        }
    }
}

/// Definition of one view: what to select and how to keep it fresh.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub name: String,
    pub directives: Vec<SelectionDirective>,
    /// Resolve again after connectivity drops and recovers. Off by
    /// default: updates missed while offline are otherwise lost.
    pub reload_on_reconnect: bool,
    /// Periodic full reload. `None` = never.
    pub refresh_interval: Option<Duration>,
    /// Component fetches allowed in flight per directive.
    pub fetch_concurrency: usize,
}

impl ViewConfig {
    pub fn new(name: impl Into<String>, directives: Vec<SelectionDirective>) -> Self {
        Self {
            name: name.into(),
            directives,
            reload_on_reconnect: false,
            refresh_interval: None,
            fetch_concurrency: 1,
        }
    }

    pub fn with_reload_on_reconnect(mut self, enabled: bool) -> Self {
        self.reload_on_reconnect = enabled;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }
}
