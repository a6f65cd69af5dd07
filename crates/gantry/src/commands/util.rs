//! Shared helpers for subcommand handlers.

use crossterm::event::{Event, KeyCode, KeyEventKind};
use crossterm::{event, terminal};

use gantry_core::{DeviceRecord, Fleet};

use crate::config::Settings;
use crate::discovery;
use crate::error::CliError;
use crate::output;

/// Browse for devices, failing when nothing matching the marker shows up.
pub async fn discover_devices(settings: &Settings) -> Result<Vec<DeviceRecord>, CliError> {
    let marker = settings.marker.clone();
    let window = settings.discovery_window;
    let records = tokio::task::spawn_blocking(move || discovery::browse(&marker, window))
        .await
        .map_err(|e| CliError::Io(std::io::Error::other(e)))??;

    if records.is_empty() {
        return Err(CliError::NoDevices {
            marker: settings.marker.clone(),
        });
    }
    Ok(records)
}

/// Discover and connect the whole fleet, reporting per-device failures.
pub async fn connect_fleet(settings: &Settings) -> Result<Fleet, CliError> {
    let records = discover_devices(settings).await?;
    output::print_devices(&records);

    output::status(&format!("Connecting to {} gantries", records.len()));
    let (fleet, report) = Fleet::connect_all(records, &settings.fleet).await;
    output::print_report("connect", &report);

    if fleet.is_empty() {
        return Err(CliError::FleetUnavailable);
    }
    Ok(fleet)
}

/// Read a single key press without waiting for enter.
///
/// Raw mode is scoped to the read so a panic elsewhere cannot leave the
/// terminal unusable.
fn read_key() -> std::io::Result<KeyCode> {
    terminal::enable_raw_mode()?;
    let result = wait_for_key();
    terminal::disable_raw_mode()?;
    result
}

fn wait_for_key() -> std::io::Result<KeyCode> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key.code);
            }
        }
    }
}

/// Async wrapper so the key wait does not block the runtime the heartbeat
/// tasks run on.
pub async fn next_key() -> Result<KeyCode, CliError> {
    tokio::task::spawn_blocking(read_key)
        .await
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?
        .map_err(CliError::Io)
}
