// Shared transport configuration for building reqwest::Client instances.
//
// Every device client is built through this module so that timeout and
// user-agent settings stay in one place. Gantry firmware speaks plain HTTP
// on the local network; there is no TLS or cookie state to configure.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
///
/// The timeout is deliberately short: one unreachable device must not stall
/// a fleet-wide playback step for longer than this bound.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::ApiError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("gantry/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
