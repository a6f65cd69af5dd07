//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use gantry_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Discovery ────────────────────────────────────────────────────
    #[error("Service discovery failed: {message}")]
    #[diagnostic(
        code(gantry::discovery),
        help("mDNS browsing needs a network interface with multicast enabled.")
    )]
    Discovery { message: String },

    #[error("No gantries found (marker '{marker}')")]
    #[diagnostic(
        code(gantry::no_devices),
        help(
            "Check that the devices are powered and on this network.\n\
             A different marker can be set with --marker or GANTRY_MARKER;\n\
             a longer browse with --discovery-window."
        )
    )]
    NoDevices { marker: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to device '{name}'")]
    #[diagnostic(
        code(gantry::connection_failed),
        help("Check that the device is reachable and its control server is up.")
    )]
    ConnectionFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Device '{name}' is not connected")]
    #[diagnostic(
        code(gantry::not_connected),
        help("The session was closed or the device stopped answering heartbeats.")
    )]
    NotConnected { name: String },

    /// Every discovered device failed to connect.
    #[error("No device in the fleet could be connected")]
    #[diagnostic(code(gantry::fleet_unavailable))]
    FleetUnavailable,

    // ── Fleet consistency ────────────────────────────────────────────
    #[error("Trajectory length mismatch: device '{device}' reports {found}, expected {expected}")]
    #[diagnostic(
        code(gantry::trajectory_mismatch),
        help(
            "The fleet was not recorded as one synchronized session.\n\
             Re-record the trajectory with every device connected."
        )
    )]
    TrajectoryMismatch {
        device: String,
        expected: u32,
        found: u32,
    },

    #[error("Nothing to play back: device '{device}' reports an empty trajectory")]
    #[diagnostic(code(gantry::empty_trajectory), help("Record a trajectory first."))]
    EmptyTrajectory { device: String },

    // ── Device operations ────────────────────────────────────────────
    #[error("Device operation failed: {message}")]
    #[diagnostic(code(gantry::device_error))]
    Device { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(gantry::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
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
            Self::ConnectionFailed { .. } | Self::NotConnected { .. } | Self::FleetUnavailable => {
                exit_code::CONNECTION
            }
            Self::NoDevices { .. } => exit_code::NOT_FOUND,
            Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotConnected { name } => Self::NotConnected { name },

            CoreError::ConnectFailed { name, source } => Self::ConnectionFailed {
                name,
                source: source.into(),
            },

            CoreError::TrajectoryMismatch {
                device,
                expected,
                found,
            } => Self::TrajectoryMismatch {
                device,
                expected,
                found,
            },

            CoreError::EmptyTrajectory { device } => Self::EmptyTrajectory { device },

            CoreError::EmptyFleet => Self::FleetUnavailable,

            err @ (CoreError::HeartbeatExhausted { .. }
            | CoreError::Rejected { .. }
            | CoreError::Api { .. }) => Self::Device {
                message: err.to_string(),
            },
        }
    }
}
