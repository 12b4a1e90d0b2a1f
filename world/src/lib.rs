#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative runner registry for HTop Gear.
//!
//! The registry is the only state that survives between ticks. It turns the
//! volatile, reordering stream of process samples into long-lived runners
//! keyed by process identifier, and ages out runners whose process vanished.

use std::collections::BTreeMap;

use htop_gear_core::{
    Command, Event, ProcessId, ProcessSample, RunnerSnapshot, RunnerStatus, Timestamp,
    DEAD_TIMEOUT, GRACE_TIMEOUT, INITIAL_POSITION_SPREAD,
};
use htop_gear_system_velocity::{compute_velocity, derive_status, is_aggressive, VelocityInputs};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_PLACEMENT_SEED: u64 = 0x6874_6f70_6765_6172;

/// Represents the authoritative HTop Gear registry.
#[derive(Debug)]
pub struct World {
    runners: BTreeMap<ProcessId, Runner>,
    aggressive_mode: bool,
    clock: Timestamp,
    placement: ChaCha8Rng,
}

impl World {
    /// Creates an empty registry using the built-in placement seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_PLACEMENT_SEED)
    }

    /// Creates an empty registry whose starting positions derive from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            runners: BTreeMap::new(),
            aggressive_mode: false,
            clock: Timestamp::ZERO,
            placement: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn upsert(&mut self, sample: ProcessSample, now: Timestamp, out_events: &mut Vec<Event>) {
        let pid = sample.pid;
        if !self.runners.contains_key(&pid) {
            let position = self.placement.gen_range(0.0..INITIAL_POSITION_SPREAD);
            let _ = self.runners.insert(pid, Runner::joining(pid, position));
            out_events.push(Event::RunnerJoined { pid, position });
        }

        let aggressive_mode = self.aggressive_mode;
        if let Some(runner) = self.runners.get_mut(&pid) {
            runner.refresh(sample, now, aggressive_mode);
        }
    }

    fn reap(&mut self, now: Timestamp, out_events: &mut Vec<Event>) {
        let mut retired: Vec<ProcessId> = Vec::new();
        for runner in self.runners.values_mut() {
            if now.since(runner.last_seen) <= DEAD_TIMEOUT {
                continue;
            }

            if runner.status != RunnerStatus::Dead {
                runner.status = RunnerStatus::Dead;
                runner.velocity = 0.0;
                runner.dead_at = Some(now);
                out_events.push(Event::RunnerDied {
                    pid: runner.pid,
                    at: now,
                });
            }

            let died = runner.dead_at.unwrap_or(now);
            if now.since(died) > GRACE_TIMEOUT {
                retired.push(runner.pid);
            }
        }

        for pid in retired {
            if self.runners.remove(&pid).is_some() {
                out_events.push(Event::RunnerRetired { pid });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureRace { aggressive_mode } => {
            world.aggressive_mode = aggressive_mode;
        }
        Command::ObserveSamples {
            samples,
            observed_at,
        } => {
            world.clock = world.clock.max(observed_at);
            for sample in samples {
                world.upsert(sample, observed_at, out_events);
            }
            world.reap(observed_at, out_events);
        }
        Command::MoveRunner {
            pid,
            position,
            obstacle_hit,
        } => {
            let Some(runner) = world.runners.get_mut(&pid) else {
                return;
            };
            if runner.status.is_frozen() {
                return;
            }

            let from = runner.position;
            runner.position = position;
            runner.obstacle_hit = obstacle_hit;
            out_events.push(Event::RunnerMoved {
                pid,
                from,
                to: position,
                obstacle_hit,
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use htop_gear_core::{ProcessId, RunnerSnapshot, RunnerView, Timestamp};

    /// Captures a read-only view of every runner in the registry.
    #[must_use]
    pub fn runner_view(world: &World) -> RunnerView {
        let snapshots = world.runners.values().map(|runner| runner.snapshot()).collect();
        RunnerView::from_snapshots(snapshots)
    }

    /// Captures the state of a single runner, if it is registered.
    #[must_use]
    pub fn runner(world: &World, pid: ProcessId) -> Option<RunnerSnapshot> {
        world.runners.get(&pid).map(|runner| runner.snapshot())
    }

    /// Number of runners currently registered, dead ones included.
    #[must_use]
    pub fn runner_count(world: &World) -> usize {
        world.runners.len()
    }

    /// Reports whether the aggressive vehicle mode is enabled.
    #[must_use]
    pub fn aggressive_mode(world: &World) -> bool {
        world.aggressive_mode
    }

    /// Latest clock reading observed by the registry.
    #[must_use]
    pub fn clock(world: &World) -> Timestamp {
        world.clock
    }
}

#[derive(Clone, Debug)]
struct Runner {
    pid: ProcessId,
    name: String,
    position: f32,
    velocity: f32,
    cpu: f32,
    mem: f32,
    raw_state: String,
    status: RunnerStatus,
    last_seen: Timestamp,
    dead_at: Option<Timestamp>,
    aggressive: bool,
    obstacle_hit: bool,
}

impl Runner {
    fn joining(pid: ProcessId, position: f32) -> Self {
        Self {
            pid,
            name: String::new(),
            position,
            velocity: 0.0,
            cpu: 0.0,
            mem: 0.0,
            raw_state: String::new(),
            status: RunnerStatus::Running,
            last_seen: Timestamp::ZERO,
            dead_at: None,
            aggressive: false,
            obstacle_hit: false,
        }
    }

    fn refresh(&mut self, sample: ProcessSample, now: Timestamp, aggressive_mode: bool) {
        self.aggressive = is_aggressive(aggressive_mode, &sample.command);
        self.name = sample.command;
        self.cpu = sample.cpu;
        self.mem = sample.mem;
        self.status = derive_status(&sample.state);
        self.raw_state = sample.state;
        self.velocity = compute_velocity(VelocityInputs {
            status: self.status,
            cpu: self.cpu,
            mem: self.mem,
            aggressive: self.aggressive,
        });
        self.obstacle_hit = false;
        self.last_seen = now;
    }

    fn snapshot(&self) -> RunnerSnapshot {
        RunnerSnapshot {
            pid: self.pid,
            name: self.name.clone(),
            position: self.position,
            velocity: self.velocity,
            cpu: self.cpu,
            mem: self.mem,
            raw_state: self.raw_state.clone(),
            status: self.status,
            last_seen: self.last_seen,
            dead_at: self.dead_at,
            aggressive: self.aggressive,
            obstacle_hit: self.obstacle_hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pid: u32, cpu: f32, mem: f32, state: &str, command: &str) -> ProcessSample {
        ProcessSample::new(ProcessId::new(pid), cpu, mem, state, command)
    }

    fn observe(world: &mut World, samples: Vec<ProcessSample>, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::ObserveSamples {
                samples,
                observed_at: Timestamp::from_millis(millis),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn new_runner_starts_within_spread() {
        let mut world = World::with_seed(7);
        let samples = (1..=64).map(|pid| sample(pid, 1.0, 1.0, "S", "sh")).collect();
        let events = observe(&mut world, samples, 0);

        assert_eq!(events.len(), 64);
        for runner in query::runner_view(&world).iter() {
            assert!((0.0..INITIAL_POSITION_SPREAD).contains(&runner.position));
            assert_eq!(runner.status, RunnerStatus::Running);
        }
    }

    #[test]
    fn starting_positions_follow_seed() {
        let mut first = World::with_seed(99);
        let mut second = World::with_seed(99);
        let _ = observe(&mut first, vec![sample(3, 0.0, 0.0, "R", "a")], 0);
        let _ = observe(&mut second, vec![sample(3, 0.0, 0.0, "R", "a")], 0);

        let pid = ProcessId::new(3);
        assert_eq!(
            query::runner(&first, pid).map(|runner| runner.position),
            query::runner(&second, pid).map(|runner| runner.position)
        );
    }

    #[test]
    fn upsert_overwrites_telemetry_but_keeps_position() {
        let mut world = World::new();
        let _ = observe(&mut world, vec![sample(5, 10.0, 1.0, "S", "old")], 0);
        let pid = ProcessId::new(5);
        let start = query::runner(&world, pid).expect("runner").position;

        let events = observe(&mut world, vec![sample(5, 90.0, 2.0, "R", "new")], 600);
        let runner = query::runner(&world, pid).expect("runner");

        assert!(events.is_empty(), "known pid must not rejoin");
        assert_eq!(runner.name, "new");
        assert_eq!(runner.raw_state, "R");
        assert_eq!(runner.position, start);
        assert_eq!(runner.last_seen, Timestamp::from_millis(600));
        assert!(runner.velocity > 5.0);
    }

    #[test]
    fn duplicate_rows_keep_last_sample() {
        let mut world = World::new();
        let events = observe(
            &mut world,
            vec![sample(8, 1.0, 1.0, "S", "first"), sample(8, 2.0, 1.0, "Z", "second")],
            0,
        );

        assert_eq!(events.len(), 1);
        let runner = query::runner(&world, ProcessId::new(8)).expect("runner");
        assert_eq!(runner.name, "second");
        assert_eq!(runner.status, RunnerStatus::Zombie);
    }

    #[test]
    fn aggressive_mode_applies_on_next_upsert() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureRace {
                aggressive_mode: true,
            },
            &mut events,
        );
        let _ = observe(
            &mut world,
            vec![sample(1, 90.0, 90.0, "R", "chrome"), sample(2, 90.0, 90.0, "R", "vim")],
            0,
        );

        assert!(query::aggressive_mode(&world));
        let chrome = query::runner(&world, ProcessId::new(1)).expect("chrome");
        let vim = query::runner(&world, ProcessId::new(2)).expect("vim");
        assert!(chrome.aggressive);
        assert!(!vim.aggressive);
        assert!((chrome.velocity - 3.25).abs() < 1e-4);
        assert!((vim.velocity - 1.6).abs() < 1e-4);
    }

    #[test]
    fn move_is_ignored_for_frozen_and_unknown_runners() {
        let mut world = World::new();
        let _ = observe(&mut world, vec![sample(4, 0.0, 0.0, "DW", "kswapd")], 0);
        let pid = ProcessId::new(4);
        let before = query::runner(&world, pid).expect("runner").position;

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveRunner {
                pid,
                position: 30.0,
                obstacle_hit: true,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::MoveRunner {
                pid: ProcessId::new(404),
                position: 1.0,
                obstacle_hit: false,
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(query::runner(&world, pid).expect("runner").position, before);
    }

    #[test]
    fn next_upsert_clears_obstacle_flag() {
        let mut world = World::new();
        let pid = ProcessId::new(6);
        let _ = observe(&mut world, vec![sample(6, 50.0, 0.0, "R", "cc")], 0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveRunner {
                pid,
                position: 9.5,
                obstacle_hit: true,
            },
            &mut events,
        );
        assert!(query::runner(&world, pid).expect("runner").obstacle_hit);

        let _ = observe(&mut world, vec![sample(6, 50.0, 0.0, "R", "cc")], 600);
        let runner = query::runner(&world, pid).expect("runner");
        assert!(!runner.obstacle_hit);
        assert_eq!(runner.position, 9.5);
    }

    #[test]
    fn unseen_runner_dies_once_and_retires_after_grace() {
        let mut world = World::new();
        let pid = ProcessId::new(11);
        let _ = observe(&mut world, vec![sample(11, 20.0, 1.0, "R", "job")], 0);

        let events = observe(&mut world, Vec::new(), 2_000);
        assert!(events.is_empty(), "exactly two seconds is not a timeout");

        let events = observe(&mut world, Vec::new(), 2_100);
        assert_eq!(
            events,
            vec![Event::RunnerDied {
                pid,
                at: Timestamp::from_millis(2_100)
            }]
        );
        let dead = query::runner(&world, pid).expect("dead runner");
        assert_eq!(dead.status, RunnerStatus::Dead);
        assert_eq!(dead.velocity, 0.0);

        let events = observe(&mut world, Vec::new(), 5_000);
        assert!(events.is_empty());
        assert_eq!(
            query::runner(&world, pid).and_then(|runner| runner.dead_at),
            Some(Timestamp::from_millis(2_100))
        );

        let events = observe(&mut world, Vec::new(), 8_100);
        assert!(events.is_empty(), "exactly six seconds dead is not retired");

        let events = observe(&mut world, Vec::new(), 8_200);
        assert_eq!(events, vec![Event::RunnerRetired { pid }]);
        assert_eq!(query::runner_count(&world), 0);
    }

    #[test]
    fn reappearing_dead_runner_is_revived() {
        let mut world = World::new();
        let pid = ProcessId::new(12);
        let _ = observe(&mut world, vec![sample(12, 20.0, 1.0, "R", "job")], 0);
        let _ = observe(&mut world, Vec::new(), 3_000);

        let events = observe(&mut world, vec![sample(12, 20.0, 1.0, "R", "job")], 3_600);
        assert!(events.is_empty());
        let runner = query::runner(&world, pid).expect("runner");
        assert_eq!(runner.status, RunnerStatus::Running);
        assert!(runner.velocity > 0.0);

        let _ = observe(&mut world, Vec::new(), 20_000);
        assert_eq!(
            query::runner(&world, pid).map(|runner| runner.status),
            Some(RunnerStatus::Dead)
        );
    }

    #[test]
    fn velocity_is_zero_exactly_when_dead() {
        let mut world = World::new();
        let _ = observe(
            &mut world,
            vec![
                sample(1, 0.0, 90.0, "S", "idle"),
                sample(2, 300.0, 0.0, "R", "hot"),
                sample(3, 0.0, 0.0, "Z", "zombie"),
                sample(4, 0.0, 0.0, "W", "pit"),
            ],
            0,
        );
        let _ = observe(&mut world, vec![sample(1, 0.0, 90.0, "S", "idle")], 2_500);

        for runner in query::runner_view(&world).iter() {
            assert!(runner.velocity >= 0.0);
            assert_eq!(runner.velocity == 0.0, runner.status == RunnerStatus::Dead);
        }
    }
}
