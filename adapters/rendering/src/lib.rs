#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Two-panel text compositor for HTop Gear.
//!
//! [`compose`] turns a read-only [`Scene`] into a [`Frame`]: the race track
//! on the left and the scoreboard on the right, aligned line by line. The
//! compositor never mutates runners, lanes or obstacles; adapters decide how
//! the resulting frame reaches a terminal through [`RenderingBackend`].

mod sprites;
mod text;

pub use crossterm::style::Color;
pub use text::{Span, StyledLine};

use anyhow::Result as AnyResult;
use htop_gear_core::{
    DisplayMode, LaneView, ObstacleSet, RunnerSnapshot, RunnerStatus, TrackWidth, RACE_TITLE,
};

use self::sprites::{sprite_for, Sprite};

/// Columns reserved for the lane label printed in front of each track row.
pub const LANE_LABEL_WIDTH: usize = 40;

/// Width the left panel is padded to before the scoreboard starts.
pub const LEFT_COLUMN_WIDTH: usize = LANE_LABEL_WIDTH + 1 + TrackWidth::MAX as usize + 2;

const NAME_WIDTH: usize = 16;
const MARKER_SPACING: u32 = 8;
const MARKER_START: u32 = 4;
const SPRINT_CPU: f32 = 70.0;
const IDLE_CPU: f32 = 1.0;
const SCOREBOARD_TITLE: &str = "Scoreboard (PID | CPU% | MEM% | state | status)";
const SCOREBOARD_RULE_WIDTH: usize = 46;

const LANE_PALETTE: [Color; 12] = [
    Color::DarkRed,
    Color::DarkGreen,
    Color::DarkYellow,
    Color::DarkBlue,
    Color::DarkMagenta,
    Color::DarkCyan,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

/// Everything the compositor needs to draw one tick.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    /// Runners in lane order.
    pub lanes: &'a LaneView,
    /// Columns blocked during this tick.
    pub obstacles: &'a ObstacleSet,
    /// Track width shared with the simulation for this tick.
    pub track: TrackWidth,
    /// Monotonic frame counter driving the scrolling lane markers.
    pub frame_index: u64,
    /// Whether the aggressive vehicle mode is enabled.
    pub aggressive_mode: bool,
    /// Glyph family used for running vehicles.
    pub display_mode: DisplayMode,
}

/// Fully composed terminal frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    lines: Vec<StyledLine>,
}

impl Frame {
    /// Lines from top to bottom.
    #[must_use]
    pub fn lines(&self) -> &[StyledLine] {
        &self.lines
    }

    /// Number of terminal rows the frame occupies.
    #[must_use]
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Uncolored lines, trailing padding removed.
    #[must_use]
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| line.to_plain().trim_end().to_owned())
            .collect()
    }

    /// Uncolored rendering joined with newlines.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        self.plain_lines().join("\n")
    }
}

/// Sink that presents composed frames.
pub trait RenderingBackend {
    /// Replaces whatever was shown before with `frame`.
    fn present(&mut self, frame: &Frame) -> AnyResult<()>;
}

/// Composes the track and scoreboard panels into a single frame.
#[must_use]
pub fn compose(scene: &Scene<'_>) -> Frame {
    let left = track_panel(scene);
    let right = scoreboard_panel(scene.lanes);
    let height = left.len().max(right.len());

    let mut lines = Vec::with_capacity(height);
    for index in 0..height {
        let mut line = left.get(index).cloned().unwrap_or_default();
        if let Some(score) = right.get(index) {
            line.pad_to(LEFT_COLUMN_WIDTH);
            line.push(" ", None);
            line.append(score.clone());
        }
        lines.push(line);
    }
    Frame { lines }
}

fn track_panel(scene: &Scene<'_>) -> Vec<StyledLine> {
    let header = header_text(scene);
    let rule = "=".repeat(header.chars().count());
    let mut lines = vec![StyledLine::plain(header), StyledLine::plain(rule), legend()];

    let sprites: Vec<Sprite> = scene
        .lanes
        .iter()
        .map(|runner| sprite_for(runner, scene.display_mode))
        .collect();
    let lane_height = match scene.display_mode {
        DisplayMode::Compact => 1,
        DisplayMode::Ascii => sprites.iter().map(Sprite::height).max().unwrap_or(1),
    };

    for (index, (runner, sprite)) in scene.lanes.iter().zip(&sprites).enumerate() {
        let lane = LaneRows {
            scene,
            runner,
            sprite,
            color: lane_color(index),
            lane_height,
        };
        for row in 0..lane_height {
            let mut line = if row == 0 {
                lane_label(index, runner)
            } else {
                StyledLine::new()
            };
            line.pad_to(LANE_LABEL_WIDTH);
            line.push(" ", None);
            line.append(lane.row(row));
            lines.push(line);
        }
    }
    lines
}

fn header_text(scene: &Scene<'_>) -> String {
    let alive = scene
        .lanes
        .iter()
        .filter(|runner| runner.status != RunnerStatus::Dead)
        .count();
    let mode = match scene.display_mode {
        DisplayMode::Compact => "compact",
        DisplayMode::Ascii => "ascii",
    };
    let aggressive = if scene.aggressive_mode { "on" } else { "off" };
    format!("{RACE_TITLE} - {alive} runners alive | aggressive mode: {aggressive} | display: {mode}")
}

fn legend() -> StyledLine {
    let entries = [
        ("sprint", Color::DarkRed),
        ("run", Color::DarkGreen),
        ("idle", Color::DarkCyan),
        ("pit", Color::DarkYellow),
        ("zombie", Color::DarkMagenta),
        ("X_X", Color::DarkGrey),
    ];
    let mut line = StyledLine::plain("Legend: ");
    for (index, (label, color)) in entries.into_iter().enumerate() {
        if index > 0 {
            line.push(" / ", None);
        }
        line.push(label, Some(color));
    }
    line
}

fn lane_label(index: usize, runner: &RunnerSnapshot) -> StyledLine {
    let mut line = StyledLine::plain(format!(
        "Lane {:02} {:<width$} ",
        index + 1,
        trim_name(&runner.name),
        width = NAME_WIDTH
    ));
    let (label, color) = status_label(runner);
    line.push(label, Some(color));
    line
}

struct LaneRows<'a> {
    scene: &'a Scene<'a>,
    runner: &'a RunnerSnapshot,
    sprite: &'a Sprite,
    color: Color,
    lane_height: usize,
}

impl LaneRows<'_> {
    fn row(&self, row: usize) -> StyledLine {
        let width = self.scene.track.columns() as usize;
        let mut cells: Vec<(char, Option<Color>)> = vec![(' ', None); width];

        let offset = (self.scene.frame_index % u64::from(MARKER_SPACING)) as u32;
        let mut column = MARKER_START + offset;
        while (column as usize) + 1 < width {
            cells[column as usize] = ('-', None);
            column += MARKER_SPACING;
        }
        cells[0] = ('|', None);
        cells[self.scene.track.finish_column() as usize] = ('|', None);

        let top = (self.lane_height - self.sprite.height()) / 2;
        let middle = top + self.sprite.height() / 2;
        let position = self.runner.position.max(0.0).floor() as usize;

        if row == middle {
            for obstacle in self.scene.obstacles.iter() {
                if let Some(cell) = cells.get_mut(obstacle as usize) {
                    *cell = ('#', None);
                }
            }
        }

        if let Some(sprite_row) = row.checked_sub(top).and_then(|r| self.sprite.rows().get(r)) {
            for (cell, glyph) in cells.iter_mut().skip(position).zip(sprite_row.chars()) {
                *cell = (glyph, Some(self.color));
            }
        }

        if row == middle && self.runner.obstacle_hit {
            if let Some(cell) = cells.get_mut(position) {
                *cell = ('!', Some(Color::DarkRed));
            }
        }

        let mut line = StyledLine::new();
        for (glyph, color) in cells {
            line.push(glyph.to_string(), color);
        }
        line
    }
}

fn scoreboard_panel(lanes: &LaneView) -> Vec<StyledLine> {
    let mut lines = vec![
        StyledLine::plain(SCOREBOARD_TITLE),
        StyledLine::plain("-".repeat(SCOREBOARD_RULE_WIDTH)),
        StyledLine::new(),
    ];
    for (index, runner) in lanes.iter().enumerate() {
        let mut line = StyledLine::new();
        line.push("\u{25a0}", Some(lane_color(index)));
        line.push(
            format!(
                " {:>5} {:<name$} {:>5.1} {:>5.1} {:<6} ",
                runner.pid.get(),
                trim_name(&runner.name),
                runner.cpu,
                runner.mem,
                runner.raw_state,
                name = NAME_WIDTH
            ),
            None,
        );
        let (label, color) = status_label(runner);
        line.push(label, Some(color));
        lines.push(line);
    }
    lines
}

fn status_label(runner: &RunnerSnapshot) -> (&'static str, Color) {
    match runner.status {
        RunnerStatus::Dead => ("X_X", Color::DarkGrey),
        RunnerStatus::Zombie => ("zombie", Color::DarkMagenta),
        RunnerStatus::PitStop => ("pit", Color::DarkYellow),
        RunnerStatus::Running if runner.cpu > SPRINT_CPU => ("sprint", Color::DarkRed),
        RunnerStatus::Running if runner.cpu < IDLE_CPU => ("idle", Color::DarkCyan),
        RunnerStatus::Running => ("run", Color::DarkGreen),
    }
}

fn lane_color(index: usize) -> Color {
    LANE_PALETTE[index % LANE_PALETTE.len()]
}

fn trim_name(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}
