use thiserror::Error;

/// Top-level error type for the `qsync-api` crate.
///
/// Covers every failure mode of the gateway: socket lifecycle, JSON-RPC
/// errors reported by the core, timeouts, and malformed payloads.
/// `qsync-core` maps these into its own diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// No live session -- the request was never sent, or the socket
    /// dropped before the response arrived.
    #[error("Not connected to core")]
    NotConnected,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Protocol ────────────────────────────────────────────────────
    /// Structured JSON-RPC error returned by the core.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// JSON (de)serialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Directory ───────────────────────────────────────────────────
    /// The component directory has not been loaded yet.
    #[error("Component directory unavailable")]
    DirectoryUnavailable,
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::NotConnected | Self::Timeout { .. }
        )
    }

    /// Returns the JSON-RPC error code, if the core reported one.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}
