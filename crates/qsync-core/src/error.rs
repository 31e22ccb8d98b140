// ── Core error types ──
//
// Consumers of the core never see JSON-RPC codes or socket errors
// directly. The `From<qsync_api::Error>` impl translates transport-layer
// failures into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to core at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Core disconnected")]
    Disconnected,

    #[error("Core connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Component directory unavailable: {message}")]
    DirectoryUnavailable { message: String },

    #[error("Component not found: {name}")]
    ComponentNotFound { name: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        /// JSON-RPC error code, when the core returned one.
        code: Option<i64>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Disconnected | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<qsync_api::Error> for CoreError {
    fn from(err: qsync_api::Error) -> Self {
        match err {
            qsync_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: "<core>".into(),
                reason,
            },
            qsync_api::Error::WebSocketClosed { .. } | qsync_api::Error::NotConnected => {
                CoreError::Disconnected
            }
            qsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid core URL: {e}"),
            },
            qsync_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            qsync_api::Error::Rpc { code, message } => CoreError::Gateway {
                message,
                code: Some(code),
            },
            qsync_api::Error::Deserialization { message, .. } => CoreError::Gateway {
                message: format!("unexpected response shape: {message}"),
                code: None,
            },
            qsync_api::Error::DirectoryUnavailable => CoreError::DirectoryUnavailable {
                message: "no component list has been received yet".into(),
            },
        }
    }
}
