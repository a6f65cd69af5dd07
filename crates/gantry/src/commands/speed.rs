//! `gantry speed` -- set the base target speed on every device.

use crate::cli::SpeedArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: &SpeedArgs, settings: &Settings) -> Result<(), CliError> {
    let fleet = util::connect_fleet(settings).await?;

    let report = fleet.set_target_speed_all(args.value).await;
    output::print_report("set target speed", &report);
    if report.is_ok() {
        output::status(&format!(
            "Target speed {} set on {} gantries",
            args.value,
            fleet.len()
        ));
    }

    fleet.disconnect_all().await;
    Ok(())
}
