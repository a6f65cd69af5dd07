// ── Runtime fleet configuration ──
//
// Tuning for connection lifecycle and liveness monitoring.
// Built by the CLI and handed in; core never reads config files.

use std::time::Duration;

use gantry_api::TransportConfig;

/// Configuration applied to every connection in the fleet.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Per-request timeout. Bounds how long one unreachable device can
    /// stall a fleet-wide operation.
    pub request_timeout: Duration,
    /// Delay between liveness polls.
    pub heartbeat_interval: Duration,
    /// Consecutive failed polls before a device is declared lost.
    pub heartbeat_failure_threshold: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(2),
            heartbeat_failure_threshold: 5,
        }
    }
}

impl FleetConfig {
    /// Transport settings for building device clients.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.request_timeout,
        }
    }
}
