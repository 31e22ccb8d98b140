//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use qsync_config::ConfigError;
use qsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to core at {url}")]
    #[diagnostic(
        code(qsync::connection_failed),
        help(
            "Check that the core is running and reachable.\n\
             URL: {url}\n\
             Try a longer connect timeout in the profile (connect_timeout)."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lost connection to the core")]
    #[diagnostic(code(qsync::disconnected))]
    Disconnected,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(qsync::not_found),
        help("Run: qsync {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Component directory unavailable: {message}")]
    #[diagnostic(
        code(qsync::directory_unavailable),
        help("The core has not published its component list. Retry once it finishes booting.")
    )]
    DirectoryUnavailable { message: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Core rejected the request: {message}")]
    #[diagnostic(code(qsync::gateway))]
    Gateway { message: String, code: Option<i64> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(qsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(qsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Add a [profiles.{name}] table to the config file, or pass --core."
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No core configured")]
    #[diagnostic(
        code(qsync::no_config),
        help(
            "Pass --core ws://<host>/qrc, set QSYNC_CORE, or add a profile.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(qsync::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(qsync::timeout),
        help("Increase timeout with --timeout or check core responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("{0}")]
    #[diagnostic(code(qsync::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(qsync::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Disconnected => CliError::Disconnected,
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::DirectoryUnavailable { message } => {
                CliError::DirectoryUnavailable { message }
            }
            CoreError::ComponentNotFound { name } => CliError::NotFound {
                resource_type: "component".into(),
                identifier: name,
                list_command: "components".into(),
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Gateway { message, code } => CliError::Gateway { message, code },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::UnknownView { name } => CliError::NotFound {
                resource_type: "view".into(),
                identifier: name,
                list_command: "view --help".into(),
            },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Io(err) => CliError::Io(err),
            ConfigError::Serialization(err) => CliError::Render(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::ConnectionFailed {
                    url: "ws://core".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 3 }, exit_code::TIMEOUT),
            (
                CoreError::ComponentNotFound {
                    name: "Lobby".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ValidationFailed {
                    message: "empty component".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Gateway {
                    message: "bad".into(),
                    code: Some(8),
                },
                exit_code::GENERAL,
            ),
        ];

        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(CliError::from(err).exit_code(), expected, "{label}");
        }
    }

    #[test]
    fn unknown_view_is_not_found() {
        let err = CliError::from(ConfigError::UnknownView {
            name: "lights".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("lights"));
    }
}
