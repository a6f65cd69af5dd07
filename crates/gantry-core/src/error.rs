// ── Core error types ──
//
// Fleet-facing errors from gantry-core. Consumers never see raw transport
// errors without the device they belong to; per-device wrapping happens at
// the call site via the constructors below.

use gantry_api::ApiError;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// A command was attempted against a device that is not connected.
    ///
    /// Raised without any network call: once a session is gone (explicit
    /// disconnect or heartbeat exhaustion), requests against it are a
    /// correctness bug, not merely wasted I/O.
    #[error("Device '{name}' is not connected")]
    NotConnected { name: String },

    #[error("Failed to connect to '{name}': {source}")]
    ConnectFailed {
        name: String,
        #[source]
        source: ApiError,
    },

    /// Liveness threshold exceeded; the device was forced to Disconnected.
    #[error("Device '{name}' lost after {failures} consecutive heartbeat failures")]
    HeartbeatExhausted { name: String, failures: u32 },

    // ── Fleet consistency errors ─────────────────────────────────────
    /// Trajectory lengths differ across the fleet. Fatal to playback
    /// entry: the fleet was not recorded as one synchronized session.
    #[error(
        "Trajectory length mismatch: device '{device}' reports {found}, expected {expected}"
    )]
    TrajectoryMismatch {
        device: String,
        expected: u32,
        found: u32,
    },

    /// Playback requires at least one device to provide an authoritative
    /// trajectory length.
    #[error("Fleet has no devices")]
    EmptyFleet,

    /// The recorded trajectory has no waypoints to play back.
    #[error("Device '{device}' reports an empty trajectory")]
    EmptyTrajectory { device: String },

    // ── Operation errors ─────────────────────────────────────────────
    /// The device answered but declined the operation.
    #[error("Device '{device}' rejected {operation}")]
    Rejected {
        device: String,
        operation: &'static str,
    },

    // ── Per-device API errors ────────────────────────────────────────
    /// A request against one device failed at the transport or protocol
    /// layer.
    #[error("Device '{device}': {source}")]
    Api {
        device: String,
        #[source]
        source: ApiError,
    },
}

impl CoreError {
    /// Wrap an [`ApiError`] with the device it came from.
    pub fn api(device: impl Into<String>, source: ApiError) -> Self {
        Self::Api {
            device: device.into(),
            source,
        }
    }
}
