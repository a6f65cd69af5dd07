//! Clap derive structures for the `gantry` CLI.
//!
//! Defines the command tree, global flags, and the value-enum mirrors of
//! the wire-level PID addressing types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use gantry_api::{PidChannel, PidLoop, PidTerm};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gantry -- fleet controller for networked two-axis motion stages
#[derive(Debug, Parser)]
#[command(
    name = "gantry",
    version,
    about = "Coordinate a fleet of gantry motion stages from the command line",
    long_about = "Discovers gantry control servers over mDNS, manages one \
        authenticated session per device with heartbeat liveness detection, \
        and drives fleet-wide trajectory recording and synchronized playback.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Only accept discovered services whose name contains this marker
    #[arg(long, short = 'm', env = "GANTRY_MARKER", global = true)]
    pub marker: Option<String>,

    /// How long to browse for devices, in seconds
    #[arg(long, env = "GANTRY_DISCOVERY_WINDOW", global = true)]
    pub discovery_window: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, env = "GANTRY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Config file path override
    #[arg(long, env = "GANTRY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse for gantry control servers and list them
    #[command(alias = "d")]
    Discover,

    /// Full interactive session: record a trajectory, then replay it
    Run,

    /// Set the base target speed on every device
    Speed(SpeedArgs),

    /// Write one PID parameter on every device
    Pid(PidArgs),
}

#[derive(Debug, Args)]
pub struct SpeedArgs {
    /// Target speed handed to the firmware
    pub value: f64,
}

#[derive(Debug, Args)]
pub struct PidArgs {
    /// Motor channel
    #[arg(value_enum)]
    pub channel: ChannelArg,

    /// Control loop
    #[arg(value_enum)]
    pub pid_loop: LoopArg,

    /// PID term (or the low-pass filter constant)
    #[arg(value_enum)]
    pub term: TermArg,

    /// Parameter value
    pub value: f64,
}

// ── Value-enum mirrors ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChannelArg {
    Ch0,
    Ch1,
}

impl From<ChannelArg> for PidChannel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Ch0 => Self::Ch0,
            ChannelArg::Ch1 => Self::Ch1,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LoopArg {
    Position,
    Velocity,
}

impl From<LoopArg> for PidLoop {
    fn from(arg: LoopArg) -> Self {
        match arg {
            LoopArg::Position => Self::Position,
            LoopArg::Velocity => Self::Velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TermArg {
    P,
    I,
    D,
    Lpf,
}

impl From<TermArg> for PidTerm {
    fn from(arg: TermArg) -> Self {
        match arg {
            TermArg::P => Self::P,
            TermArg::I => Self::I,
            TermArg::D => Self::D,
            TermArg::Lpf => Self::Lpf,
        }
    }
}
