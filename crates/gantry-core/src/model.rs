// ── Domain types shared across the fleet layer ──

use serde::{Deserialize, Serialize};

/// One discovered gantry control server.
///
/// Produced by service discovery and immutable once handed to the
/// controller. The `name` is the fleet-wide device key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
        }
    }
}

/// Connection state observable by consumers.
///
/// Transitions are driven only by connect/disconnect calls and heartbeat
/// outcomes; nothing else writes this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Which neighbouring waypoint a playback step targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Next,
    Previous,
}
