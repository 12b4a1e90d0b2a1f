#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the HTop Gear race.

mod config;
mod race;
mod report;
mod terminal;

use std::{
    fs::File,
    io,
    sync::Mutex,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use htop_gear_core::Timestamp;
use htop_gear_rendering::RenderingBackend;
use htop_gear_sampler::{PsSampler, SampleProvider};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Args, LogSink, RaceConfig},
    race::{run_headless, Race, SAMPLE_RETRY_DELAY},
    report::Report,
    terminal::{detect_track_width, PlainTextBackend, TerminalSession},
};

/// Entry point for the HTop Gear command-line interface.
fn main() -> Result<()> {
    let config = RaceConfig::from_args(Args::parse())?;
    init_tracing(config.log_sink())?;

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(
        seed,
        max_lanes = config.max_lanes,
        aggressive = config.aggressive_mode,
        "starting race"
    );

    let mut race = Race::new(&config, seed);
    let mut sampler = PsSampler::new();
    let started = Instant::now();
    let clock = || Timestamp::from_elapsed(started.elapsed());

    let outcome = match config.headless_ticks {
        Some(ticks) => {
            let mut backend = PlainTextBackend::new(io::stdout().lock());
            run_headless(
                &mut race,
                &mut sampler,
                &mut backend,
                ticks,
                clock,
                detect_track_width,
            )
            .map(|_| ())
        }
        None => run_interactive(&mut race, &mut sampler, clock),
    };

    if let Some(path) = &config.report {
        Report::from_race(&race).write_to(path)?;
    }
    tracing::info!(frames = race.frames(), "race finished");
    outcome
}

fn run_interactive(
    race: &mut Race,
    sampler: &mut dyn SampleProvider,
    clock: impl Fn() -> Timestamp,
) -> Result<()> {
    let mut session = TerminalSession::start()?;
    loop {
        let pause = match sampler.poll() {
            Ok(samples) => {
                let frame = race.tick(samples, clock(), detect_track_width());
                session.present(&frame)?;
                race.tick_interval()
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read processes");
                SAMPLE_RETRY_DELAY
            }
        };
        if session.wait_for_quit(pause)? {
            return Ok(());
        }
    }
}

fn init_tracing(sink: LogSink) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match sink {
        LogSink::File(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        LogSink::Stderr => {
            let _ = builder.with_writer(io::stderr).try_init();
        }
        LogSink::Discard => {
            let _ = builder.with_writer(io::sink).try_init();
        }
    }
    Ok(())
}
