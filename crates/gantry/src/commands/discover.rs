//! `gantry discover` -- browse and list gantry control servers.

use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(settings: &Settings) -> Result<(), CliError> {
    output::status(&format!(
        "Browsing for gantries ({}s window, marker '{}')",
        settings.discovery_window.as_secs(),
        settings.marker
    ));

    let records = util::discover_devices(settings).await?;
    output::print_devices(&records);
    output::status(&format!("{} gantries found", records.len()));
    Ok(())
}
