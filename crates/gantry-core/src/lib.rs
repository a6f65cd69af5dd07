// gantry-core: fleet orchestration between gantry-api and consumers.
//
// Connection lifecycle with heartbeat liveness, the fleet registry, and
// the two trajectory workflows (recording, synchronized playback).

pub mod config;
pub mod connection;
pub mod error;
pub mod fleet;
pub mod model;
pub mod playback;
pub mod record;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::FleetConfig;
pub use connection::GantryConnection;
pub use error::CoreError;
pub use fleet::{BatchReport, Fleet};
pub use model::{ConnectionState, DeviceRecord, StepDirection};
pub use playback::{Playback, StepOutcome, axis_multipliers};
pub use record::Recorder;

// Wire-level types consumers need alongside the fleet API.
pub use gantry_api::{Mode, PidChannel, PidLoop, PidTerm};
