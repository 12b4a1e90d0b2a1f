#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic lane selection that ranks runners for display.

use std::cmp::Ordering;

use htop_gear_core::{LaneView, RunnerSnapshot, RunnerView, DEFAULT_MAX_LANES};

/// Pure system that picks which runners occupy the visible lanes.
#[derive(Clone, Copy, Debug)]
pub struct LaneSelector {
    max_lanes: usize,
}

impl LaneSelector {
    /// Creates a selector that fills at most `max_lanes` lanes.
    #[must_use]
    pub const fn new(max_lanes: usize) -> Self {
        Self { max_lanes }
    }

    /// Maximum number of lanes filled per tick.
    #[must_use]
    pub const fn max_lanes(&self) -> usize {
        self.max_lanes
    }

    /// Ranks every registered runner with [`lane_order`] and keeps the leaders.
    #[must_use]
    pub fn select(&self, runners: &RunnerView) -> LaneView {
        let mut ranked: Vec<RunnerSnapshot> = runners.iter().cloned().collect();
        ranked.sort_by(lane_order);
        ranked.truncate(self.max_lanes);
        LaneView::from_ordered(ranked)
    }
}

impl Default for LaneSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LANES)
    }
}

/// Total order used for lane assignment: CPU descending, then pid ascending.
///
/// A NaN CPU reading ranks below every real reading.
#[must_use]
pub fn lane_order(left: &RunnerSnapshot, right: &RunnerSnapshot) -> Ordering {
    cpu_key(right.cpu)
        .total_cmp(&cpu_key(left.cpu))
        .then_with(|| left.pid.cmp(&right.pid))
}

fn cpu_key(cpu: f32) -> f32 {
    if cpu.is_nan() {
        f32::NEG_INFINITY
    } else {
        cpu
    }
}
