#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Position integration for runners occupying the visible lanes.

use std::time::Duration;

use htop_gear_core::{Command, LaneView, ObstacleSet, RunnerSnapshot, TrackWidth};

/// Fraction of its speed a runner keeps while standing on an obstacle.
pub const OBSTACLE_DRAG: f32 = 0.4;

/// Pure system that advances lane runners and proposes their new positions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Physics;

impl Physics {
    /// Creates the integrator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Advances every movable lane runner by `dt` and emits the outcome.
    ///
    /// Dead and pit-stopped runners are left in place and produce no command.
    pub fn handle(
        &self,
        lanes: &LaneView,
        obstacles: &ObstacleSet,
        dt: Duration,
        track: TrackWidth,
        out: &mut Vec<Command>,
    ) {
        let delta = dt.as_secs_f32();
        let span = track.span();
        for runner in lanes.iter() {
            if runner.status.is_frozen() {
                continue;
            }

            let obstacle_hit = is_blocked(runner, obstacles);
            let speed = if obstacle_hit {
                runner.velocity * OBSTACLE_DRAG
            } else {
                runner.velocity
            };

            out.push(Command::MoveRunner {
                pid: runner.pid,
                position: integrate(runner.position, speed, delta, span),
                obstacle_hit,
            });
        }
    }
}

fn is_blocked(runner: &RunnerSnapshot, obstacles: &ObstacleSet) -> bool {
    let column = runner.position.floor();
    column >= 0.0 && obstacles.contains(column as u32)
}

/// Moves `position` forward and wraps it into `[0, span)`.
///
/// Overshoot carries over the finish line instead of snapping to the start.
#[must_use]
pub fn integrate(position: f32, speed: f32, delta: f32, span: f32) -> f32 {
    let next = position + speed * delta;
    if next >= span {
        next.rem_euclid(span)
    } else {
        next
    }
}
