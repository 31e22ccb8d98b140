//! CLI configuration -- thin wrapper around `qsync_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--core, --timeout).

use std::time::Duration;

use qsync_core::{ControllerConfig, ViewConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use qsync_config::{Config, config_path, load_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the active profile and CLI overrides.
///
/// `--core` works without any profile. Naming a profile explicitly that
/// does not exist is an error; a missing default profile is not.
pub fn controller_config(global: &GlobalOpts, cfg: &Config) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut config = match (cfg.profiles.get(&profile_name), global.core.as_deref()) {
        (Some(profile), core) => {
            let mut profile = profile.clone();
            if let Some(core) = core {
                profile.core = core.to_owned();
            }
            qsync_config::profile_to_controller_config(&profile, &cfg.defaults)?
        }
        (None, Some(core)) if global.profile.is_none() => {
            let mut config = ControllerConfig::new(qsync_config::parse_core_url(core)?);
            config.timeout = Duration::from_secs(cfg.defaults.timeout);
            config.connect_timeout = Duration::from_secs(cfg.defaults.connect_timeout);
            config
        }
        (None, _) if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        (None, _) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Look up a named view and translate it for the core.
pub fn view_config(cfg: &Config, name: &str) -> Result<ViewConfig, CliError> {
    let view = cfg.view(name)?;
    Ok(qsync_config::view_to_view_config(name, view)?)
}
