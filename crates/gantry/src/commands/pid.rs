//! `gantry pid` -- write one PID parameter on every device.

use crate::cli::PidArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: &PidArgs, settings: &Settings) -> Result<(), CliError> {
    let fleet = util::connect_fleet(settings).await?;

    let report = fleet
        .set_pid_all(
            args.channel.into(),
            args.pid_loop.into(),
            args.term.into(),
            args.value,
        )
        .await;
    output::print_report("set PID parameter", &report);
    if report.is_ok() {
        output::status(&format!(
            "{:?}/{:?}/{:?} = {} set on {} gantries",
            args.channel,
            args.pid_loop,
            args.term,
            args.value,
            fleet.len()
        ));
    }

    fleet.disconnect_all().await;
    Ok(())
}
