#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the HTop Gear race.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative runner registry, and pure systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. Systems consume immutable views such as
//! [`RunnerView`] and [`LaneView`] and respond exclusively with new command
//! batches.

use std::{collections::BTreeSet, ops::Range, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical title displayed above the track.
pub const RACE_TITLE: &str = "HTop Gear";

/// Duration a runner may go unseen before it is declared dead.
pub const DEAD_TIMEOUT: Duration = Duration::from_secs(2);

/// Duration a dead runner stays on the registry before it is removed.
pub const GRACE_TIMEOUT: Duration = Duration::from_secs(6);

/// Upper bound (exclusive) of the random starting position of a new runner.
pub const INITIAL_POSITION_SPREAD: f32 = 5.0;

/// Number of lanes displayed when no explicit limit is configured.
pub const DEFAULT_MAX_LANES: usize = 10;

/// Interval between two ticks when no explicit cadence is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(600);

/// Commands that express all permissible registry mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures race-wide behaviour applied on every subsequent upsert.
    ConfigureRace {
        /// Whether browser-like processes drive the aggressive vehicle archetype.
        aggressive_mode: bool,
    },
    /// Upserts a fresh batch of process samples and ages out vanished runners.
    ObserveSamples {
        /// Samples acquired from the operating system for this tick.
        samples: Vec<ProcessSample>,
        /// Simulation clock reading at which the batch was observed.
        observed_at: Timestamp,
    },
    /// Records the outcome of integrating a runner's position for one tick.
    MoveRunner {
        /// Identifier of the runner that advanced.
        pid: ProcessId,
        /// Position on the track after integration.
        position: f32,
        /// Whether the runner was slowed by an obstacle this tick.
        obstacle_hit: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a previously unseen process entered the race.
    RunnerJoined {
        /// Identifier of the new runner.
        pid: ProcessId,
        /// Starting position assigned to the runner.
        position: f32,
    },
    /// Announces that a runner went unseen for longer than [`DEAD_TIMEOUT`].
    RunnerDied {
        /// Identifier of the runner that died.
        pid: ProcessId,
        /// Clock reading recorded as the time of death.
        at: Timestamp,
    },
    /// Announces that a dead runner outlived [`GRACE_TIMEOUT`] and was removed.
    RunnerRetired {
        /// Identifier of the removed runner.
        pid: ProcessId,
    },
    /// Confirms that a runner's position was updated.
    RunnerMoved {
        /// Identifier of the runner that moved.
        pid: ProcessId,
        /// Position before the move.
        from: f32,
        /// Position after the move.
        to: f32,
        /// Whether an obstacle slowed the runner.
        obstacle_hit: bool,
    },
}

/// Operating system process identifier used to key runners.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a new process identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Single row of process telemetry, valid for one tick only.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSample {
    /// Identifier of the sampled process.
    pub pid: ProcessId,
    /// CPU usage in percent; exceeds 100 on multi-core machines.
    pub cpu: f32,
    /// Resident memory usage in percent of the machine total.
    pub mem: f32,
    /// Raw state code reported by the operating system, e.g. `"R"` or `"Ss"`.
    pub state: String,
    /// Command name of the process.
    pub command: String,
}

impl ProcessSample {
    /// Creates a sample from its raw components.
    #[must_use]
    pub fn new(
        pid: ProcessId,
        cpu: f32,
        mem: f32,
        state: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            pid,
            cpu,
            mem,
            state: state.into(),
            command: command.into(),
        }
    }
}

/// Lifecycle status of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunnerStatus {
    /// Process is scheduled or runnable.
    Running,
    /// Process exited but was not reaped by its parent.
    Zombie,
    /// Process is waiting or paging; rendered stationary.
    PitStop,
    /// Process vanished from the samples for longer than [`DEAD_TIMEOUT`].
    Dead,
}

impl RunnerStatus {
    /// Reports whether the integrator leaves runners with this status in place.
    #[must_use]
    pub const fn is_frozen(self) -> bool {
        match self {
            Self::Dead | Self::PitStop => true,
            Self::Running | Self::Zombie => false,
        }
    }
}

/// Reading of the simulation clock measured from the start of the session.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Clock reading at the start of the session.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp from the elapsed session time.
    #[must_use]
    pub const fn from_elapsed(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    /// Creates a timestamp from whole milliseconds of elapsed session time.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Elapsed session time represented by the timestamp.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub fn since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Width of the race track measured in terminal columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackWidth(u32);

impl TrackWidth {
    /// Narrowest track produced from a terminal size.
    pub const MIN: u32 = 20;
    /// Widest track produced from a terminal size.
    pub const MAX: u32 = 90;
    /// Columns reserved next to the track for lane labels.
    pub const GUTTER: u32 = 40;
    /// Terminal width assumed when the environment reports nothing usable.
    pub const DEFAULT_TERMINAL_COLUMNS: u32 = 100;
    /// Margin kept free of obstacles at both ends of the track.
    pub const OBSTACLE_MARGIN: u32 = 5;

    /// Creates a track width without applying terminal clamps.
    ///
    /// Widths below three columns are raised to three so the span that
    /// runners move across is never empty.
    #[must_use]
    pub const fn new(columns: u32) -> Self {
        if columns < 3 {
            Self(3)
        } else {
            Self(columns)
        }
    }

    /// Derives the track width from the terminal's column count.
    ///
    /// The label gutter is subtracted first and the result is clamped into
    /// [`Self::MIN`]..=[`Self::MAX`].
    #[must_use]
    pub fn from_terminal_columns(columns: u32) -> Self {
        let available = columns.saturating_sub(Self::GUTTER);
        Self(available.clamp(Self::MIN, Self::MAX))
    }

    /// Total number of columns drawn for the track.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.0
    }

    /// Column holding the finish border.
    #[must_use]
    pub const fn finish_column(&self) -> u32 {
        self.0 - 2
    }

    /// Length of the looping span that runner positions live in.
    #[must_use]
    pub fn span(&self) -> f32 {
        self.finish_column() as f32
    }

    /// Columns eligible for obstacle placement, if any.
    #[must_use]
    pub fn obstacle_columns(&self) -> Option<Range<u32>> {
        let start = Self::OBSTACLE_MARGIN;
        let end = self.0.saturating_sub(Self::OBSTACLE_MARGIN);
        (start < end).then_some(start..end)
    }
}

/// Glyph family used when drawing running vehicles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Single-row pictographic vehicles.
    #[default]
    Compact,
    /// Multi-row ASCII art vehicles.
    Ascii,
}

/// Immutable representation of a single runner's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct RunnerSnapshot {
    /// Process identifier keying the runner.
    pub pid: ProcessId,
    /// Command name reported by the latest sample.
    pub name: String,
    /// Position along the track span.
    pub position: f32,
    /// Speed in columns per second derived from the latest sample.
    pub velocity: f32,
    /// CPU usage in percent from the latest sample.
    pub cpu: f32,
    /// Memory usage in percent from the latest sample.
    pub mem: f32,
    /// Raw operating system state code from the latest sample.
    pub raw_state: String,
    /// Lifecycle status.
    pub status: RunnerStatus,
    /// Clock reading of the latest sample that mentioned the process.
    pub last_seen: Timestamp,
    /// Clock reading at which the runner was declared dead, if ever.
    pub dead_at: Option<Timestamp>,
    /// Whether the aggressive vehicle archetype applies to the runner.
    pub aggressive: bool,
    /// Whether an obstacle slowed the runner during the latest integration.
    pub obstacle_hit: bool,
}

/// Read-only snapshot describing every runner in the registry.
#[derive(Clone, Debug, Default)]
pub struct RunnerView {
    snapshots: Vec<RunnerSnapshot>,
}

impl RunnerView {
    /// Creates a new runner view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<RunnerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.pid);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots ordered by process identifier.
    pub fn iter(&self) -> impl Iterator<Item = &RunnerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a specific runner.
    #[must_use]
    pub fn get(&self, pid: ProcessId) -> Option<&RunnerSnapshot> {
        self.snapshots
            .binary_search_by_key(&pid, |snapshot| snapshot.pid)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of runners captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no runners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<RunnerSnapshot> {
        self.snapshots
    }
}

/// Ordered selection of runners that occupy the visible lanes this tick.
///
/// Lane `0` is drawn first. The order is decided by the lane selector and is
/// never re-sorted by this type.
#[derive(Clone, Debug, Default)]
pub struct LaneView {
    lanes: Vec<RunnerSnapshot>,
}

impl LaneView {
    /// Wraps snapshots that are already in lane order.
    #[must_use]
    pub fn from_ordered(lanes: Vec<RunnerSnapshot>) -> Self {
        Self { lanes }
    }

    /// Iterator over the runners in lane order.
    pub fn iter(&self) -> impl Iterator<Item = &RunnerSnapshot> {
        self.lanes.iter()
    }

    /// Number of occupied lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Reports whether no lane is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Process identifiers in lane order.
    #[must_use]
    pub fn pids(&self) -> Vec<ProcessId> {
        self.lanes.iter().map(|runner| runner.pid).collect()
    }

    /// Arithmetic mean of CPU usage across the lanes, zero when empty.
    #[must_use]
    pub fn average_cpu(&self) -> f32 {
        if self.lanes.is_empty() {
            return 0.0;
        }
        let total: f32 = self.lanes.iter().map(|runner| runner.cpu).sum();
        total / self.lanes.len() as f32
    }

    /// Re-reads every lane from a newer registry view while keeping lane order.
    ///
    /// Runners missing from `view` are dropped.
    #[must_use]
    pub fn refreshed(&self, view: &RunnerView) -> Self {
        let lanes = self
            .lanes
            .iter()
            .filter_map(|runner| view.get(runner.pid).cloned())
            .collect();
        Self { lanes }
    }

    /// Consumes the view, yielding the snapshots in lane order.
    #[must_use]
    pub fn into_vec(self) -> Vec<RunnerSnapshot> {
        self.lanes
    }
}

/// Track columns blocked by obstacles during a single tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObstacleSet {
    columns: BTreeSet<u32>,
}

impl ObstacleSet {
    /// Creates an obstacle set without any blocked column.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an obstacle set from the provided columns, collapsing duplicates.
    #[must_use]
    pub fn from_columns(columns: impl IntoIterator<Item = u32>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Blocks the provided column; returns `false` when it was already blocked.
    pub fn insert(&mut self, column: u32) -> bool {
        self.columns.insert(column)
    }

    /// Reports whether an obstacle occupies the column.
    #[must_use]
    pub fn contains(&self, column: u32) -> bool {
        self.columns.contains(&column)
    }

    /// Iterator over blocked columns in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.columns.iter().copied()
    }

    /// Number of distinct blocked columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Reports whether no column is blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pid: u32, cpu: f32) -> RunnerSnapshot {
        RunnerSnapshot {
            pid: ProcessId::new(pid),
            name: format!("proc-{pid}"),
            position: 0.0,
            velocity: 1.0,
            cpu,
            mem: 0.0,
            raw_state: "R".to_owned(),
            status: RunnerStatus::Running,
            last_seen: Timestamp::ZERO,
            dead_at: None,
            aggressive: false,
            obstacle_hit: false,
        }
    }

    #[test]
    fn track_width_subtracts_gutter_and_clamps() {
        assert_eq!(TrackWidth::from_terminal_columns(100).columns(), 60);
        assert_eq!(TrackWidth::from_terminal_columns(140).columns(), 90);
        assert_eq!(TrackWidth::from_terminal_columns(300).columns(), 90);
        assert_eq!(TrackWidth::from_terminal_columns(45).columns(), 20);
        assert_eq!(TrackWidth::from_terminal_columns(0).columns(), 20);
    }

    #[test]
    fn track_span_reserves_finish_border() {
        let track = TrackWidth::new(50);
        assert_eq!(track.finish_column(), 48);
        assert!((track.span() - 48.0).abs() < f32::EPSILON);
    }

    #[test]
    fn obstacle_columns_keep_margins() {
        assert_eq!(TrackWidth::new(50).obstacle_columns(), Some(5..45));
        assert_eq!(TrackWidth::new(10).obstacle_columns(), None);
    }

    #[test]
    fn timestamp_since_saturates() {
        let early = Timestamp::from_millis(500);
        let late = Timestamp::from_millis(2_600);
        assert_eq!(late.since(early), Duration::from_millis(2_100));
        assert_eq!(early.since(late), Duration::ZERO);
    }

    #[test]
    fn runner_view_orders_by_pid_and_finds_entries() {
        let view = RunnerView::from_snapshots(vec![snapshot(9, 1.0), snapshot(2, 3.0)]);
        let pids: Vec<u32> = view.iter().map(|runner| runner.pid.get()).collect();
        assert_eq!(pids, vec![2, 9]);
        assert_eq!(view.get(ProcessId::new(9)).map(|runner| runner.cpu), Some(1.0));
        assert!(view.get(ProcessId::new(4)).is_none());
    }

    #[test]
    fn lane_view_refresh_keeps_order_and_drops_missing() {
        let lanes = LaneView::from_ordered(vec![snapshot(5, 80.0), snapshot(1, 20.0)]);
        let mut moved = snapshot(5, 80.0);
        moved.position = 12.5;
        let view = RunnerView::from_snapshots(vec![moved]);

        let refreshed = lanes.refreshed(&view);

        assert_eq!(refreshed.pids(), vec![ProcessId::new(5)]);
        assert_eq!(refreshed.iter().next().map(|runner| runner.position), Some(12.5));
    }

    #[test]
    fn average_cpu_is_zero_for_empty_lanes() {
        assert_eq!(LaneView::default().average_cpu(), 0.0);
        let lanes = LaneView::from_ordered(vec![snapshot(1, 30.0), snapshot(2, 60.0)]);
        assert!((lanes.average_cpu() - 45.0).abs() < f32::EPSILON);
    }

    #[test]
    fn obstacle_set_collapses_duplicates() {
        let set = ObstacleSet::from_columns([7, 7, 12]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(7));
        assert!(!set.contains(8));
    }

    #[test]
    fn status_serializes_by_variant_name() {
        let encoded = serde_json::to_string(&RunnerStatus::PitStop).expect("serialize");
        assert_eq!(encoded, "\"PitStop\"");
    }
}
