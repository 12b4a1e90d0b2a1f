#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure status and velocity model that turns process telemetry into motion.
//!
//! Nothing here keeps state: identical inputs always produce identical
//! statuses and velocities, so the registry can recompute both on every
//! upsert without caching.

use htop_gear_core::RunnerStatus;

const PIT_STOP_VELOCITY: f32 = 0.2;
const ZOMBIE_VELOCITY: f32 = 0.5;
const MIN_VELOCITY: f32 = 0.1;
const CPU_PER_COLUMN: f32 = 25.0;
const MEM_PER_PENALTY: f32 = 20.0;

const SPRINT_THRESHOLD: f32 = 80.0;
const SPRINT_BONUS: f32 = 2.5;
const PUSH_THRESHOLD: f32 = 50.0;
const PUSH_BONUS: f32 = 1.2;

const AGGRESSIVE_BASE_FACTOR: f32 = 0.5;
const AGGRESSIVE_WEIGHT_PENALTY: f32 = -0.2;

/// Inputs consulted when computing a runner's velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityInputs {
    /// Lifecycle status of the runner.
    pub status: RunnerStatus,
    /// CPU usage in percent.
    pub cpu: f32,
    /// Memory usage in percent.
    pub mem: f32,
    /// Whether the aggressive vehicle archetype applies to the runner.
    pub aggressive: bool,
}

/// Classifies a raw operating system state code.
///
/// A `Z` in either case marks a zombie. Otherwise an uppercase `W` marks a
/// pit stop; lowercase `w` does not. Everything else is running.
#[must_use]
pub fn derive_status(raw_state: &str) -> RunnerStatus {
    if raw_state.chars().any(|c| c.eq_ignore_ascii_case(&'z')) {
        return RunnerStatus::Zombie;
    }
    if raw_state.contains('W') {
        return RunnerStatus::PitStop;
    }
    RunnerStatus::Running
}

/// Computes the speed, in track columns per second, of a runner.
///
/// Dead runners never move; every other status yields at least `0.1`.
#[must_use]
pub fn compute_velocity(inputs: VelocityInputs) -> f32 {
    match inputs.status {
        RunnerStatus::Dead => 0.0,
        RunnerStatus::PitStop => PIT_STOP_VELOCITY,
        RunnerStatus::Zombie => ZOMBIE_VELOCITY,
        RunnerStatus::Running => running_velocity(inputs.cpu, inputs.mem, inputs.aggressive),
    }
}

fn running_velocity(cpu: f32, mem: f32, aggressive: bool) -> f32 {
    let mut base = (cpu / CPU_PER_COLUMN).max(MIN_VELOCITY);
    if cpu > SPRINT_THRESHOLD {
        base += SPRINT_BONUS;
    } else if cpu > PUSH_THRESHOLD {
        base += PUSH_BONUS;
    }

    let mut weight_penalty = mem / MEM_PER_PENALTY;
    if aggressive {
        base *= AGGRESSIVE_BASE_FACTOR;
        weight_penalty = AGGRESSIVE_WEIGHT_PENALTY;
    }

    (base - weight_penalty).max(MIN_VELOCITY)
}

/// Reports whether a command name looks like a web browser.
#[must_use]
pub fn is_browser_like(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.contains("chrome") || lowered.contains("chromium")
}

/// Decides whether the aggressive archetype applies to a runner.
#[must_use]
pub fn is_aggressive(aggressive_mode: bool, name: &str) -> bool {
    aggressive_mode && is_browser_like(name)
}
