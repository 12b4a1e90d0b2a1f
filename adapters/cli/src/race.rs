//! Per-tick pipeline wiring the registry, systems and compositor together.

use std::{thread, time::Duration};

use anyhow::Result;
use htop_gear_core::{
    Command, DisplayMode, Event, ProcessSample, RunnerSnapshot, Timestamp, TrackWidth,
};
use htop_gear_rendering::{compose, Frame, RenderingBackend, Scene};
use htop_gear_sampler::SampleProvider;
use htop_gear_system_lanes::{lane_order, LaneSelector};
use htop_gear_system_obstacles::{Config as ObstacleConfig, Obstacles};
use htop_gear_system_physics::Physics;
use htop_gear_world::{self as world, query, World};

use crate::config::RaceConfig;

/// Pause before retrying after the sample provider failed.
pub(crate) const SAMPLE_RETRY_DELAY: Duration = Duration::from_secs(2);

const OBSTACLE_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Owns the registry and the systems that advance it once per tick.
#[derive(Debug)]
pub(crate) struct Race {
    world: World,
    lanes: LaneSelector,
    obstacles: Obstacles,
    physics: Physics,
    display_mode: DisplayMode,
    tick_interval: Duration,
    frame_index: u64,
    events: Vec<Event>,
}

impl Race {
    pub(crate) fn new(config: &RaceConfig, seed: u64) -> Self {
        let mut world = World::with_seed(seed);
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureRace {
                aggressive_mode: config.aggressive_mode,
            },
            &mut events,
        );

        Self {
            world,
            lanes: LaneSelector::new(config.max_lanes),
            obstacles: Obstacles::new(ObstacleConfig::new(seed ^ OBSTACLE_SEED_SALT)),
            physics: Physics::new(),
            display_mode: config.display_mode,
            tick_interval: config.tick_interval,
            frame_index: 0,
            events,
        }
    }

    pub(crate) fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of frames composed so far.
    pub(crate) fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Feeds one batch of samples through the pipeline and composes the frame.
    pub(crate) fn tick(
        &mut self,
        samples: Vec<ProcessSample>,
        now: Timestamp,
        track: TrackWidth,
    ) -> Frame {
        self.events.clear();
        world::apply(
            &mut self.world,
            Command::ObserveSamples {
                samples,
                observed_at: now,
            },
            &mut self.events,
        );

        let lanes = self.lanes.select(&query::runner_view(&self.world));
        let obstacles = self.obstacles.generate(&lanes, track);

        let mut commands = Vec::new();
        self.physics
            .handle(&lanes, &obstacles, self.tick_interval, track, &mut commands);
        for command in commands {
            world::apply(&mut self.world, command, &mut self.events);
        }
        self.log_events();

        let lanes = lanes.refreshed(&query::runner_view(&self.world));
        let frame = compose(&Scene {
            lanes: &lanes,
            obstacles: &obstacles,
            track,
            frame_index: self.frame_index,
            aggressive_mode: query::aggressive_mode(&self.world),
            display_mode: self.display_mode,
        });
        self.frame_index = self.frame_index.wrapping_add(1);
        frame
    }

    /// Every registered runner in lane order, including those off screen.
    pub(crate) fn standings(&self) -> Vec<RunnerSnapshot> {
        let mut runners = query::runner_view(&self.world).into_vec();
        runners.sort_by(lane_order);
        runners
    }

    pub(crate) fn clock(&self) -> Timestamp {
        query::clock(&self.world)
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> &[Event] {
        &self.events
    }

    fn log_events(&self) {
        for event in &self.events {
            match event {
                Event::RunnerJoined { pid, position } => {
                    tracing::debug!(pid = pid.get(), position, "runner joined");
                }
                Event::RunnerDied { pid, at } => {
                    let at_ms = millis(at.elapsed());
                    tracing::debug!(pid = pid.get(), at_ms, "runner died");
                }
                Event::RunnerRetired { pid } => {
                    tracing::debug!(pid = pid.get(), "runner retired");
                }
                Event::RunnerMoved {
                    pid,
                    from,
                    to,
                    obstacle_hit,
                } => {
                    tracing::trace!(pid = pid.get(), from, to, obstacle_hit, "runner moved");
                }
            }
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs `ticks` sampling attempts without terminal control.
///
/// A failed poll still consumes an attempt so a broken provider cannot stall
/// the run. Returns the number of frames presented.
pub(crate) fn run_headless(
    race: &mut Race,
    sampler: &mut dyn SampleProvider,
    backend: &mut dyn RenderingBackend,
    ticks: u64,
    mut clock: impl FnMut() -> Timestamp,
    track_width: impl Fn() -> TrackWidth,
) -> Result<u64> {
    let mut presented = 0;
    for attempt in 0..ticks {
        let pause = match sampler.poll() {
            Ok(samples) => {
                let frame = race.tick(samples, clock(), track_width());
                backend.present(&frame)?;
                presented += 1;
                race.tick_interval()
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read processes");
                SAMPLE_RETRY_DELAY
            }
        };
        if attempt + 1 < ticks {
            thread::sleep(pause);
        }
    }
    Ok(presented)
}
