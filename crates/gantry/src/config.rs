//! CLI configuration.
//!
//! TOML file + `GANTRY_` env overrides via figment, CLI flags on top.
//! The file is optional; every field has a default. The resolved result
//! is the `gantry_core::FleetConfig` plus the discovery tuning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use gantry_core::FleetConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Substring a discovered service name must contain.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// How long to browse for devices (seconds).
    #[serde(default = "default_discovery_window")]
    pub discovery_window_secs: u64,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Delay between liveness polls (seconds).
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Consecutive failed polls before a device is declared lost.
    #[serde(default = "default_heartbeat_threshold")]
    pub heartbeat_failure_threshold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            discovery_window_secs: default_discovery_window(),
            request_timeout_secs: default_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_failure_threshold: default_heartbeat_threshold(),
        }
    }
}

fn default_marker() -> String {
    "gantry".into()
}
fn default_discovery_window() -> u64 {
    5
}
fn default_timeout() -> u64 {
    5
}
fn default_heartbeat_interval() -> u64 {
    2
}
fn default_heartbeat_threshold() -> u32 {
    5
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "perchworks", "gantry")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("gantry.toml"))
}

/// Load the config: defaults, then TOML file, then `GANTRY_` env vars.
pub fn load(path_override: Option<&Path>) -> Result<Config, CliError> {
    let path = path_override.map_or_else(config_path, Path::to_path_buf);
    let config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GANTRY_"))
        .extract()?;
    Ok(config)
}

// ── Resolved settings ────────────────────────────────────────────────

/// Config after CLI flag overrides, in the units the rest of the program
/// wants.
#[derive(Debug, Clone)]
pub struct Settings {
    pub marker: String,
    pub discovery_window: Duration,
    pub fleet: FleetConfig,
}

/// Apply CLI flags over the loaded file/env config.
pub fn resolve(global: &GlobalOpts) -> Result<Settings, CliError> {
    let config = load(global.config.as_deref())?;

    let marker = global
        .marker
        .clone()
        .unwrap_or(config.marker)
        .to_lowercase();
    let discovery_window = Duration::from_secs(
        global.discovery_window.unwrap_or(config.discovery_window_secs),
    );
    let request_timeout =
        Duration::from_secs(global.timeout.unwrap_or(config.request_timeout_secs));

    Ok(Settings {
        marker,
        discovery_window,
        fleet: FleetConfig {
            request_timeout,
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            heartbeat_failure_threshold: config.heartbeat_failure_threshold,
        },
    })
}

// ── Tests ────────────────────────────────────────────────────────────
