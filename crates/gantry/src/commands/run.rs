//! `gantry run` -- the full interactive session.
//!
//! Discover, connect, record a trajectory, then replay it with single-key
//! stepping. The fleet is always disconnected on the way out, even when a
//! phase fails.

use crossterm::event::KeyCode;

use gantry_core::{Fleet, Mode, Playback, Recorder, StepDirection, StepOutcome};

use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(settings: &Settings) -> Result<(), CliError> {
    let fleet = util::connect_fleet(settings).await?;

    // Known state before recording.
    output::print_report("set idle mode", &fleet.set_mode_all(Mode::Idle).await);

    let result = session(&fleet).await;
    fleet.disconnect_all().await;
    result
}

async fn session(fleet: &Fleet) -> Result<(), CliError> {
    if !record_phase(fleet).await? {
        output::status("Recording aborted");
        return Ok(());
    }

    loop {
        let speed = prompt_speed().await?;
        output::print_report(
            "set target speed",
            &fleet.set_target_speed_all(speed).await,
        );

        playback_phase(fleet).await?;

        output::status("Fleet idle");
        if !prompt_replay().await? {
            return Ok(());
        }
    }
}

// ── Record phase ─────────────────────────────────────────────────────

/// Returns `true` when a trajectory was saved, `false` on abort.
async fn record_phase(fleet: &Fleet) -> Result<bool, CliError> {
    output::status("Entering record mode");
    println!("  space  capture waypoint");
    println!("  enter  save trajectory");
    println!("  q      abort");

    let (recorder, report) = Recorder::enter(fleet).await?;
    output::print_report("enter record mode", &report);

    loop {
        match util::next_key().await? {
            KeyCode::Char(' ') => {
                let report = recorder.capture_waypoint().await;
                output::print_report("capture waypoint", &report);
                if report.is_ok() {
                    println!("Waypoint recorded");
                }
            }
            KeyCode::Enter => {
                output::status("Saving trajectory");
                let report = recorder.finish().await;
                output::print_report("save trajectory", &report);
                return Ok(true);
            }
            KeyCode::Char('q') => {
                output::print_report("abort recording", &recorder.abort().await);
                return Ok(false);
            }
            _ => {}
        }
    }
}

// ── Playback phase ───────────────────────────────────────────────────

async fn playback_phase(fleet: &Fleet) -> Result<(), CliError> {
    output::status("Entering playback mode");
    println!("  d  next waypoint");
    println!("  a  previous waypoint");
    println!("  q  exit playback");

    let (mut playback, report) = Playback::enter(fleet).await?;
    output::print_report("enter playback mode", &report);
    println!("Found trajectory of length {}", playback.trajectory_length());

    loop {
        println!(
            "Waypoint {}/{}",
            playback.cursor() + 1,
            playback.trajectory_length()
        );
        match util::next_key().await? {
            KeyCode::Char('d') => step_once(&mut playback, StepDirection::Next).await,
            KeyCode::Char('a') => step_once(&mut playback, StepDirection::Previous).await,
            KeyCode::Char('q') => {
                output::print_report("exit playback", &playback.exit().await);
                return Ok(());
            }
            _ => {}
        }
    }
}

async fn step_once(playback: &mut Playback<'_>, direction: StepDirection) {
    match playback.step(direction).await {
        StepOutcome::Stepped { report, .. } => output::print_report("step", &report),
        StepOutcome::Boundary => match direction {
            StepDirection::Next => println!("Reached end of trajectory"),
            StepDirection::Previous => println!("Reached beginning of trajectory"),
        },
    }
}

// ── Prompts ──────────────────────────────────────────────────────────

async fn prompt_speed() -> Result<f64, CliError> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Input::<f64>::new()
            .with_prompt("Target speed")
            .interact_text()
    })
    .await
    .map_err(|e| CliError::Io(std::io::Error::other(e)))?
    .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

async fn prompt_replay() -> Result<bool, CliError> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Confirm::new()
            .with_prompt("Run another playback pass?")
            .default(true)
            .interact()
    })
    .await
    .map_err(|e| CliError::Io(std::io::Error::other(e)))?
    .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
