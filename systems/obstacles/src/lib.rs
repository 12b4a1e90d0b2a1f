#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Load-driven obstacle generation for the race track.

use htop_gear_core::{LaneView, ObstacleSet, TrackWidth};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const LIGHT_LOAD: f32 = 40.0;
const MODERATE_LOAD: f32 = 60.0;
const HEAVY_LOAD: f32 = 80.0;

/// Configuration parameters required to construct the obstacle generator.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration drawing obstacle columns from `rng_seed`.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that scatters obstacles across the track every tick.
#[derive(Debug)]
pub struct Obstacles {
    rng: ChaCha8Rng,
}

impl Obstacles {
    /// Creates a new obstacle generator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Builds this tick's obstacle set from the average load of the lanes.
    ///
    /// Nothing from earlier ticks is carried over.
    pub fn generate(&mut self, lanes: &LaneView, track: TrackWidth) -> ObstacleSet {
        let mut obstacles = ObstacleSet::new();
        if lanes.is_empty() {
            return obstacles;
        }

        let Some(columns) = track.obstacle_columns() else {
            return obstacles;
        };

        for _ in 0..obstacle_count(lanes.average_cpu()) {
            let _ = obstacles.insert(self.rng.gen_range(columns.clone()));
        }
        obstacles
    }
}

/// Number of obstacles placed for the given average CPU load.
#[must_use]
pub fn obstacle_count(average_cpu: f32) -> usize {
    if average_cpu > HEAVY_LOAD {
        3
    } else if average_cpu > MODERATE_LOAD {
        2
    } else if average_cpu > LIGHT_LOAD {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_upper_bounds() {
        assert_eq!(obstacle_count(40.0), 0);
        assert_eq!(obstacle_count(40.5), 1);
        assert_eq!(obstacle_count(60.0), 1);
        assert_eq!(obstacle_count(80.0), 2);
        assert_eq!(obstacle_count(80.1), 3);
    }
}
