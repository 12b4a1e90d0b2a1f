//! Command-line surface and validated race configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use htop_gear_core::{DisplayMode, DEFAULT_MAX_LANES, DEFAULT_TICK_INTERVAL};
use thiserror::Error;

/// Turns live process telemetry into a terminal race.
#[derive(Debug, Parser)]
#[command(name = "htop-gear", version)]
pub(crate) struct Args {
    /// Maximum number of lanes shown on the track.
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_LANES)]
    pub(crate) max_lanes: usize,
    /// Let browser processes drive the aggressive vehicle archetype.
    #[arg(short = 'm', long)]
    pub(crate) aggressive: bool,
    /// Draw multi-row ASCII vehicles instead of pictographs.
    #[arg(long)]
    pub(crate) ascii: bool,
    /// Milliseconds between two ticks.
    #[arg(long, value_name = "MILLIS", default_value_t = default_tick_millis())]
    pub(crate) tick_ms: u64,
    /// Seed for starting positions and obstacles; random when omitted.
    #[arg(long, value_name = "SEED")]
    pub(crate) seed: Option<u64>,
    /// Run the given number of ticks without taking over the terminal.
    #[arg(long, value_name = "TICKS")]
    pub(crate) headless: Option<u64>,
    /// Write the final standings as JSON to this path on exit.
    #[arg(long, value_name = "PATH")]
    pub(crate) report: Option<PathBuf>,
    /// Send logs to this file.
    ///
    /// Headless runs log to standard error otherwise. Interactive runs
    /// discard logs without this flag since standard error is the redrawn
    /// terminal.
    #[arg(long, value_name = "PATH")]
    pub(crate) log_file: Option<PathBuf>,
}

fn default_tick_millis() -> u64 {
    crate::race::millis(DEFAULT_TICK_INTERVAL)
}

/// Rejected combinations of command-line values.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ConfigError {
    /// The track would have no lanes.
    #[error("--max-lanes must be at least 1")]
    NoLanes,
    /// The tick loop would spin without waiting.
    #[error("--tick-ms must be greater than 0")]
    ZeroTick,
    /// A headless run would not render anything.
    #[error("--headless must run at least one tick")]
    NoHeadlessTicks,
}

/// Validated settings driving one race session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RaceConfig {
    pub(crate) max_lanes: usize,
    pub(crate) aggressive_mode: bool,
    pub(crate) display_mode: DisplayMode,
    pub(crate) tick_interval: Duration,
    pub(crate) seed: Option<u64>,
    pub(crate) headless_ticks: Option<u64>,
    pub(crate) report: Option<PathBuf>,
    pub(crate) log_file: Option<PathBuf>,
}

/// Where tracing output is written for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LogSink {
    File(PathBuf),
    Stderr,
    Discard,
}

impl RaceConfig {
    pub(crate) fn log_sink(&self) -> LogSink {
        match (&self.log_file, self.headless_ticks) {
            (Some(path), _) => LogSink::File(path.clone()),
            (None, Some(_)) => LogSink::Stderr,
            (None, None) => LogSink::Discard,
        }
    }

    pub(crate) fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.max_lanes == 0 {
            return Err(ConfigError::NoLanes);
        }
        if args.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if args.headless == Some(0) {
            return Err(ConfigError::NoHeadlessTicks);
        }

        Ok(Self {
            max_lanes: args.max_lanes,
            aggressive_mode: args.aggressive,
            display_mode: if args.ascii {
                DisplayMode::Ascii
            } else {
                DisplayMode::Compact
            },
            tick_interval: Duration::from_millis(args.tick_ms),
            seed: args.seed,
            headless_ticks: args.headless,
            report: args.report,
            log_file: args.log_file,
        })
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            max_lanes: DEFAULT_MAX_LANES,
            aggressive_mode: false,
            display_mode: DisplayMode::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            seed: None,
            headless_ticks: None,
            report: None,
            log_file: None,
        }
    }
}
