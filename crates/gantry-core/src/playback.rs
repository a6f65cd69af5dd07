// ── Playback coordinator ──
//
// Steps the fleet through a recorded trajectory one waypoint at a time.
// Per-axis speed multipliers are computed so both axes of a device reach
// the target waypoint together under the firmware's constant-multiplier
// velocity model: the axis with the larger excursion runs at full rate,
// the other is scaled down proportionally. Synchrony is per-device only;
// there is no cross-device arrival barrier.

use tracing::{debug, info};

use gantry_api::Mode;

use crate::connection::GantryConnection;
use crate::error::CoreError;
use crate::fleet::{BatchReport, Fleet};
use crate::model::StepDirection;

// ── Multiplier math ──────────────────────────────────────────────────

/// Per-axis speed multipliers for one move.
///
/// `m_i = |d_i| / max(|d0|, |d1|)`, so the dominant axis gets 1.0 and the
/// other axis is scaled to arrive at the same time. When the device is
/// already at the target on both axes the maximum is zero; both
/// multipliers are defined as 0 rather than dividing by zero.
pub fn axis_multipliers(d0: f64, d1: f64) -> (f64, f64) {
    let largest = d0.abs().max(d1.abs());
    if largest == 0.0 {
        return (0.0, 0.0);
    }
    (d0.abs() / largest, d1.abs() / largest)
}

// ── Step outcome ─────────────────────────────────────────────────────

/// Result of one playback step.
#[derive(Debug)]
pub enum StepOutcome {
    /// The cursor moved; the report carries any per-device failures.
    Stepped { cursor: u32, report: BatchReport },
    /// The step would have left the trajectory; nothing was sent.
    Boundary,
}

// ── Playback ─────────────────────────────────────────────────────────

/// Fleet-wide playback session over a previously recorded trajectory.
///
/// Owns the shared waypoint cursor. The cursor is mutated only after a
/// full step across all devices completes and never leaves
/// `[0, trajectory_length - 1]`.
pub struct Playback<'a> {
    fleet: &'a Fleet,
    cursor: u32,
    trajectory_length: u32,
}

impl std::fmt::Debug for Playback<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback")
            .field("cursor", &self.cursor)
            .field("trajectory_length", &self.trajectory_length)
            .finish_non_exhaustive()
    }
}

impl<'a> Playback<'a> {
    /// Enter playback mode across the fleet.
    ///
    /// Trajectory lengths are read from every device and cross-validated
    /// *before* any mode or target-waypoint command goes out: a mismatch
    /// means the fleet was not recorded as one synchronized session, and
    /// no motion command may be issued against it. Mode/target failures
    /// after validation are collected in the returned report.
    pub async fn enter(fleet: &'a Fleet) -> Result<(Playback<'a>, BatchReport), CoreError> {
        let trajectory_length = validate_lengths(fleet).await?;

        info!(trajectory_length, "entering playback");

        let mut report = fleet.set_mode_all(Mode::Playback).await;
        for conn in fleet.iter() {
            if let Err(e) = reset_target_one(conn).await {
                report.record_failure(conn.name(), e);
            }
        }

        Ok((
            Self {
                fleet,
                cursor: 0,
                trajectory_length,
            },
            report,
        ))
    }

    /// Current waypoint index, shared across the whole fleet.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Number of waypoints in the trajectory (identical on every device).
    pub fn trajectory_length(&self) -> u32 {
        self.trajectory_length
    }

    /// Step the whole fleet one waypoint in `direction`.
    ///
    /// Devices are processed sequentially and independently; a failure on
    /// one is reported but does not roll back multipliers or indices
    /// already committed on others. The shared cursor advances once all
    /// devices have been processed.
    pub async fn step(&mut self, direction: StepDirection) -> StepOutcome {
        let Some(target) = self.target_index(direction) else {
            debug!(cursor = self.cursor, ?direction, "trajectory boundary reached");
            return StepOutcome::Boundary;
        };

        let mut report = BatchReport::default();
        for conn in self.fleet.iter() {
            if let Err(e) = step_device(conn, direction, target).await {
                report.record_failure(conn.name(), e);
            }
        }

        self.cursor = target;
        debug!(cursor = self.cursor, failed = report.failures().len(), "step complete");
        StepOutcome::Stepped {
            cursor: target,
            report,
        }
    }

    fn target_index(&self, direction: StepDirection) -> Option<u32> {
        match direction {
            StepDirection::Next => {
                let target = self.cursor + 1;
                (target < self.trajectory_length).then_some(target)
            }
            StepDirection::Previous => self.cursor.checked_sub(1),
        }
    }

    /// Leave playback: return every device to idle.
    pub async fn exit(self) -> BatchReport {
        self.fleet.set_mode_all(Mode::Idle).await
    }
}

// ── Per-device helpers ───────────────────────────────────────────────

/// Read every device's trajectory length and require them to be equal.
async fn validate_lengths(fleet: &Fleet) -> Result<u32, CoreError> {
    let mut expected: Option<(String, u32)> = None;

    for conn in fleet.iter() {
        let client = conn.client().await?;
        let length = client
            .trajectory_length()
            .await
            .map_err(|e| CoreError::api(conn.name(), e))?;

        match &expected {
            None => {
                if length == 0 {
                    return Err(CoreError::EmptyTrajectory {
                        device: conn.name().to_owned(),
                    });
                }
                expected = Some((conn.name().to_owned(), length));
            }
            Some((_, expected_len)) if *expected_len != length => {
                return Err(CoreError::TrajectoryMismatch {
                    device: conn.name().to_owned(),
                    expected: *expected_len,
                    found: length,
                });
            }
            Some(_) => {}
        }
    }

    match expected {
        Some((_, length)) => Ok(length),
        None => Err(CoreError::EmptyFleet),
    }
}

async fn reset_target_one(conn: &GantryConnection) -> Result<(), CoreError> {
    let client = conn.client().await?;
    client
        .set_target_waypoint(0)
        .await
        .map_err(|e| CoreError::api(conn.name(), e))
}

/// Run the strictly ordered per-device step sequence: read position, read
/// the target waypoint, write both multipliers, then commit the new
/// target index. The multipliers must be in effect before the index
/// changes, or the device starts moving with stale scaling.
async fn step_device(
    conn: &GantryConnection,
    direction: StepDirection,
    target: u32,
) -> Result<(), CoreError> {
    let client = conn.client().await?;
    let wrap = |e| CoreError::api(conn.name(), e);

    let (q0, q1) = client.position().await.map_err(wrap)?;
    let (w0, w1) = match direction {
        StepDirection::Next => client.next_waypoint().await.map_err(wrap)?,
        StepDirection::Previous => client.previous_waypoint().await.map_err(wrap)?,
    };

    let (m0, m1) = axis_multipliers(w0 - q0, w1 - q1);
    debug!(
        device = %conn.name(),
        q0, q1, w0, w1, m0, m1,
        "applying speed multipliers"
    );

    client.set_speed_multipliers(m0, m1).await.map_err(wrap)?;
    client.set_target_waypoint(target).await.map_err(wrap)?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn dominant_axis_runs_at_full_rate() {
        let (m0, m1) = axis_multipliers(10.0, 5.0);
        assert_eq!((m0, m1), (1.0, 0.5));
    }

    #[test]
    fn multipliers_are_direction_independent() {
        let (m0, m1) = axis_multipliers(-10.0, 5.0);
        assert_eq!((m0, m1), (1.0, 0.5));
        let (m0, m1) = axis_multipliers(3.0, -12.0);
        assert_eq!((m0, m1), (0.25, 1.0));
    }

    #[test]
    fn zero_distance_yields_zero_multipliers() {
        assert_eq!(axis_multipliers(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn single_moving_axis_keeps_other_at_zero() {
        assert_eq!(axis_multipliers(0.0, 4.0), (0.0, 1.0));
        assert_eq!(axis_multipliers(-2.5, 0.0), (1.0, 0.0));
    }

    #[test]
    fn max_multiplier_is_always_one_for_nonzero_moves() {
        let cases = [
            (0.001, 1000.0),
            (-7.5, 7.5),
            (42.0, 0.0),
            (-0.25, -0.125),
        ];
        for (d0, d1) in cases {
            let (m0, m1) = axis_multipliers(d0, d1);
            assert!((0.0..=1.0).contains(&m0), "m0 out of range for {d0},{d1}");
            assert!((0.0..=1.0).contains(&m1), "m1 out of range for {d0},{d1}");
            assert_eq!(m0.max(m1), 1.0, "no full-rate axis for {d0},{d1}");
        }
    }
}
