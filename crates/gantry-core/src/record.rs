// ── Trajectory recorder ──
//
// Relays capture events to the whole fleet while it is in record mode.
// No path planning happens here; each device stores its own waypoints.

use tracing::debug;

use gantry_api::Mode;

use crate::error::CoreError;
use crate::fleet::{BatchReport, Fleet};

/// Drives record-mode waypoint capture across a fleet.
pub struct Recorder<'a> {
    fleet: &'a Fleet,
}

impl<'a> Recorder<'a> {
    /// Put the fleet into record mode.
    ///
    /// The report names devices that rejected the mode switch; the
    /// recorder is returned regardless so the rest of the fleet can
    /// still capture.
    pub async fn enter(fleet: &'a Fleet) -> Result<(Self, BatchReport), CoreError> {
        if fleet.is_empty() {
            return Err(CoreError::EmptyFleet);
        }
        let report = fleet.set_mode_all(Mode::Record).await;
        Ok((Self { fleet }, report))
    }

    /// Capture the current position as a waypoint on every device.
    pub async fn capture_waypoint(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for conn in self.fleet.iter() {
            if let Err(e) = capture_one(conn).await {
                report.record_failure(conn.name(), e);
            }
        }
        debug!(failed = report.failures().len(), "waypoint captured");
        report
    }

    /// Persist the captured trajectory on every device.
    pub async fn finish(self) -> BatchReport {
        let mut report = BatchReport::default();
        for conn in self.fleet.iter() {
            if let Err(e) = save_one(conn).await {
                report.record_failure(conn.name(), e);
            }
        }
        report
    }

    /// Discard the in-progress capture and return the fleet to idle.
    pub async fn abort(self) -> BatchReport {
        self.fleet.set_mode_all(Mode::Idle).await
    }
}

async fn capture_one(conn: &crate::connection::GantryConnection) -> Result<(), CoreError> {
    let client = conn.client().await?;
    let accepted = client
        .add_waypoint()
        .await
        .map_err(|e| CoreError::api(conn.name(), e))?;
    if accepted {
        Ok(())
    } else {
        Err(CoreError::Rejected {
            device: conn.name().to_owned(),
            operation: "add_waypoint",
        })
    }
}

async fn save_one(conn: &crate::connection::GantryConnection) -> Result<(), CoreError> {
    let client = conn.client().await?;
    let saved = client
        .save_trajectory()
        .await
        .map_err(|e| CoreError::api(conn.name(), e))?;
    if saved {
        Ok(())
    } else {
        Err(CoreError::Rejected {
            device: conn.name().to_owned(),
            operation: "save_trajectory",
        })
    }
}
