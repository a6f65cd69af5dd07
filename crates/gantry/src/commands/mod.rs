//! Subcommand handlers.

pub mod discover;
pub mod pid;
pub mod run;
pub mod speed;
mod util;

use crate::cli::Command;
use crate::config::Settings;
use crate::error::CliError;

pub async fn dispatch(command: Command, settings: &Settings) -> Result<(), CliError> {
    match command {
        Command::Discover => discover::handle(settings).await,
        Command::Run => run::handle(settings).await,
        Command::Speed(args) => speed::handle(&args, settings).await,
        Command::Pid(args) => pid::handle(&args, settings).await,
    }
}
