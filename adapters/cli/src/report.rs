//! JSON standings written when a session ends.

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use htop_gear_core::{ProcessId, RunnerSnapshot, RunnerStatus};
use serde::Serialize;

use crate::race::{millis, Race};

#[derive(Debug, Serialize)]
pub(crate) struct Report {
    frames: u64,
    clock_ms: u64,
    standings: Vec<Standing>,
}

#[derive(Debug, Serialize)]
struct Standing {
    rank: usize,
    pid: ProcessId,
    name: String,
    status: RunnerStatus,
    state: String,
    cpu: f32,
    mem: f32,
    velocity: f32,
    position: f32,
    dead_at_ms: Option<u64>,
}

impl Standing {
    fn new(rank: usize, runner: RunnerSnapshot) -> Self {
        Self {
            rank,
            pid: runner.pid,
            name: runner.name,
            status: runner.status,
            state: runner.raw_state,
            cpu: runner.cpu,
            mem: runner.mem,
            velocity: runner.velocity,
            position: runner.position,
            dead_at_ms: runner.dead_at.map(|at| millis(at.elapsed())),
        }
    }
}

impl Report {
    pub(crate) fn from_race(race: &Race) -> Self {
        let standings = race
            .standings()
            .into_iter()
            .enumerate()
            .map(|(index, runner)| Standing::new(index + 1, runner))
            .collect();
        Self {
            frames: race.frames(),
            clock_ms: millis(race.clock().elapsed()),
            standings,
        }
    }

    pub(crate) fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), runners = self.standings.len(), "wrote standings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaceConfig;
    use htop_gear_core::{ProcessSample, Timestamp, TrackWidth};

    #[test]
    fn report_lists_runners_in_lane_order() {
        let mut race = Race::new(&RaceConfig::default(), 1);
        let _ = race.tick(
            vec![
                ProcessSample::new(ProcessId::new(4), 12.5, 1.0, "S", "idle-ish"),
                ProcessSample::new(ProcessId::new(9), 75.0, 2.0, "R+", "cargo"),
            ],
            Timestamp::from_millis(600),
            TrackWidth::new(60),
        );

        let json = serde_json::to_value(Report::from_race(&race)).expect("serialize");
        assert_eq!(json["frames"], 1);
        assert_eq!(json["clock_ms"], 600);
        assert_eq!(json["standings"][0]["rank"], 1);
        assert_eq!(json["standings"][0]["pid"], 9);
        assert_eq!(json["standings"][0]["status"], "Running");
        assert_eq!(json["standings"][0]["state"], "R+");
        assert_eq!(json["standings"][1]["pid"], 4);
        assert!(json["standings"][1]["dead_at_ms"].is_null());
    }
}
