// ── Fleet registry ──
//
// Explicit context object holding every device connection plus the
// controller's local belief of the fleet mode. Membership is fixed after
// the discovery phase; all fleet-wide operations iterate devices in name
// order and collect per-device failures instead of aborting.

use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::debug;

use gantry_api::{Mode, PidChannel, PidLoop, PidTerm};

use crate::config::FleetConfig;
use crate::connection::GantryConnection;
use crate::error::CoreError;
use crate::model::DeviceRecord;

// ── BatchReport ──────────────────────────────────────────────────────

/// Outcome of a fleet-wide operation.
///
/// Independent network peers give no atomicity; a failure on one device
/// never aborts the batch. The report names exactly the devices that
/// failed and why.
#[derive(Debug, Default)]
pub struct BatchReport {
    failures: Vec<(String, CoreError)>,
}

impl BatchReport {
    pub fn record_failure(&mut self, device: impl Into<String>, error: CoreError) {
        self.failures.push((device.into(), error));
    }

    /// `true` when every device accepted the command.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(String, CoreError)] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<(String, CoreError)> {
        self.failures
    }
}

// ── Fleet ────────────────────────────────────────────────────────────

/// The set of gantries managed together in one controller session.
pub struct Fleet {
    devices: BTreeMap<String, GantryConnection>,
    mode: watch::Sender<Mode>,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    pub fn new() -> Self {
        let (mode, _) = watch::channel(Mode::Idle);
        Self {
            devices: BTreeMap::new(),
            mode,
        }
    }

    /// Connect every discovered device, collecting per-device failures.
    ///
    /// Devices that fail to connect are left out of the fleet: a member
    /// without a session would poison every later batch operation.
    pub async fn connect_all(
        records: Vec<DeviceRecord>,
        config: &FleetConfig,
    ) -> (Self, BatchReport) {
        let mut fleet = Self::new();
        let mut report = BatchReport::default();

        for record in records {
            let name = record.name.clone();
            let conn = GantryConnection::new(record, config.clone());
            match conn.connect().await {
                Ok(()) => {
                    fleet.insert(conn);
                }
                Err(e) => report.record_failure(name, e),
            }
        }

        debug!(devices = fleet.len(), "fleet connected");
        (fleet, report)
    }

    pub fn insert(&mut self, conn: GantryConnection) {
        self.devices.insert(conn.name().to_owned(), conn);
    }

    pub fn get(&self, name: &str) -> Option<&GantryConnection> {
        self.devices.get(name)
    }

    /// Devices in name order.
    pub fn iter(&self) -> impl Iterator<Item = &GantryConnection> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The controller's local belief of the fleet mode. The device is the
    /// source of truth; this is only what was last commanded.
    pub fn mode(&self) -> Mode {
        *self.mode.borrow()
    }

    /// Subscribe to fleet mode changes.
    pub fn mode_watch(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }

    // ── Fleet-wide commands ──────────────────────────────────────────

    /// Set every device's operating mode.
    pub async fn set_mode_all(&self, mode: Mode) -> BatchReport {
        let mut report = BatchReport::default();
        for conn in self.iter() {
            if let Err(e) = set_mode_one(conn, mode).await {
                report.record_failure(conn.name(), e);
            }
        }
        self.mode.send_replace(mode);
        report
    }

    /// Set every device's base target speed.
    pub async fn set_target_speed_all(&self, value: f64) -> BatchReport {
        let mut report = BatchReport::default();
        for conn in self.iter() {
            let result = match conn.client().await {
                Ok(client) => client
                    .set_target_speed(value)
                    .await
                    .map_err(|e| CoreError::api(conn.name(), e)),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                report.record_failure(conn.name(), e);
            }
        }
        report
    }

    /// Write one PID parameter on every device.
    pub async fn set_pid_all(
        &self,
        channel: PidChannel,
        pid_loop: PidLoop,
        term: PidTerm,
        value: f64,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for conn in self.iter() {
            let result = match conn.client().await {
                Ok(client) => client
                    .set_pid(channel, pid_loop, term, value)
                    .await
                    .map_err(|e| CoreError::api(conn.name(), e)),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                report.record_failure(conn.name(), e);
            }
        }
        report
    }

    /// Tear down every connection. Each heartbeat task is joined before
    /// this returns.
    pub async fn disconnect_all(&self) {
        for conn in self.iter() {
            conn.disconnect().await;
        }
    }
}

async fn set_mode_one(conn: &GantryConnection, mode: Mode) -> Result<(), CoreError> {
    let client = conn.client().await?;
    client
        .set_mode(mode)
        .await
        .map_err(|e| CoreError::api(conn.name(), e))
}
