//! Shared configuration for qsync.
//!
//! TOML core profiles and named view definitions, loaded through
//! `figment` (defaults, then the config file, then `QSYNC_` environment
//! variables) and translated into `qsync_core` runtime config.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use qsync_core::{ControllerConfig, SelectionDirective, ViewConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{name}'")]
    UnknownProfile { name: String },

    #[error("no view named '{name}'")]
    UnknownView { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named core profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Named views: what to select and how to keep it fresh.
    #[serde(default)]
    pub views: HashMap<String, View>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            views: HashMap::new(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }

    pub fn view(&self, name: &str) -> Result<&View, ConfigError> {
        self.views
            .get(name)
            .ok_or_else(|| ConfigError::UnknownView { name: name.into() })
    }

    /// View names, sorted.
    pub fn view_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds to wait for the first connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_connect_timeout() -> u64 {
    10
}

/// A named core profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// WebSocket endpoint (e.g., "ws://192.168.1.50/qrc").
    pub core: String,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override connect timeout (seconds).
    pub connect_timeout: Option<u64>,

    /// Change-group poll rate in milliseconds.
    pub poll_rate_ms: Option<u64>,

    /// Keep-alive interval in seconds.
    pub keepalive: Option<u64>,
}

/// A named view definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct View {
    /// Selection directives, applied in order.
    #[serde(default)]
    pub select: Vec<SelectionDirective>,

    /// Resolve again when connectivity recovers.
    #[serde(default)]
    pub reload_on_reconnect: bool,

    /// Periodic full reload in seconds. 0 = never.
    #[serde(default)]
    pub refresh_interval: u64,

    /// Component fetches allowed in flight per directive.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_fetch_concurrency() -> usize {
    1
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "qsync", "qsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("qsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment variables use `__` as the nesting separator, e.g.
/// `QSYNC_PROFILES__STUDIO__CORE=ws://10.0.0.5/qrc`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("QSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url = parse_core_url(&profile.core)?;

    let mut config = ControllerConfig::new(url);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.connect_timeout =
        Duration::from_secs(profile.connect_timeout.unwrap_or(defaults.connect_timeout));
    if let Some(ms) = profile.poll_rate_ms {
        if ms == 0 {
            return Err(ConfigError::Validation {
                field: "poll_rate_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.poll_rate = Duration::from_millis(ms);
    }
    if let Some(secs) = profile.keepalive {
        config.keepalive = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Parse and check a core endpoint.
pub fn parse_core_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "core".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ConfigError::Validation {
            field: "core".into(),
            reason: format!("expected a ws:// or wss:// URL, got {raw}"),
        });
    }
    Ok(url)
}

/// Build a `ViewConfig` from a named view definition.
pub fn view_to_view_config(name: &str, view: &View) -> Result<ViewConfig, ConfigError> {
    if view.select.is_empty() {
        return Err(ConfigError::Validation {
            field: format!("views.{name}.select"),
            reason: "a view needs at least one selection directive".into(),
        });
    }

    let refresh = (view.refresh_interval > 0).then(|| Duration::from_secs(view.refresh_interval));
    Ok(ViewConfig::new(name, view.select.clone())
        .with_reload_on_reconnect(view.reload_on_reconnect)
        .with_refresh_interval(refresh)
        .with_fetch_concurrency(view.fetch_concurrency))
}
