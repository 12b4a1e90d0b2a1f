//! Glyph selection for runners drawn on the track.

use htop_gear_core::{DisplayMode, RunnerSnapshot, RunnerStatus};

const MEDIUM_MEM: f32 = 6.0;
const HEAVY_MEM: f32 = 12.0;
const EXHAUST_CPU: f32 = 70.0;

const AGGRESSIVE_PREFIX: &str = "[CHR]";

const RACE_CAR: &str = "\u{1f3ce}\u{fe0f}\u{27a1}\u{fe0f}";
const SUV: &str = "\u{1f699}\u{27a1}\u{fe0f}";
const TRUCK: &str = "\u{1f69b}\u{27a1}\u{fe0f}";
const EXHAUST: &str = "\u{1f4a8}\u{1f525}";

const ASCII_CAR: [&str; 4] = [
    "  ______",
    " /|_||_\\`.__",
    "(   _    _ _\\",
    "=`-(_)--(_)-'",
];

/// Rows of glyphs drawn for a single runner, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Sprite {
    rows: Vec<String>,
}

impl Sprite {
    fn single(row: impl Into<String>) -> Self {
        Self {
            rows: vec![row.into()],
        }
    }

    pub(crate) fn rows(&self) -> &[String] {
        &self.rows
    }

    pub(crate) fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Picks the sprite for a runner under the requested display mode.
pub(crate) fn sprite_for(runner: &RunnerSnapshot, mode: DisplayMode) -> Sprite {
    match runner.status {
        RunnerStatus::Dead => Sprite::single("X_X"),
        RunnerStatus::Zombie => Sprite::single("zZ>"),
        RunnerStatus::PitStop => Sprite::single("PIT"),
        RunnerStatus::Running => match mode {
            DisplayMode::Compact => compact_vehicle(runner),
            DisplayMode::Ascii => ascii_vehicle(runner),
        },
    }
}

fn compact_vehicle(runner: &RunnerSnapshot) -> Sprite {
    let body = if runner.mem > HEAVY_MEM {
        TRUCK
    } else if runner.mem > MEDIUM_MEM {
        SUV
    } else {
        RACE_CAR
    };

    let mut row = String::new();
    if runner.aggressive {
        row.push_str(AGGRESSIVE_PREFIX);
    }
    row.push_str(body);
    if runner.cpu > EXHAUST_CPU {
        row.push_str(EXHAUST);
    }
    Sprite::single(row)
}

fn ascii_vehicle(runner: &RunnerSnapshot) -> Sprite {
    let mut rows: Vec<String> = ASCII_CAR.iter().map(|row| (*row).to_owned()).collect();

    let weight = if runner.mem > HEAVY_MEM {
        "[P]"
    } else if runner.mem > MEDIUM_MEM {
        "[+]"
    } else {
        ""
    };
    let aggressive = if runner.aggressive { AGGRESSIVE_PREFIX } else { "" };
    rows[0] = format!("{aggressive}{weight}{}", rows[0]);

    if runner.cpu > EXHAUST_CPU {
        if let Some(last) = rows.last_mut() {
            last.push_str(">>");
        }
    }
    Sprite { rows }
}

/// Tallest sprite any running vehicle can produce in ASCII mode.
#[cfg(test)]
pub(crate) const ASCII_CAR_HEIGHT: usize = ASCII_CAR.len();

#[cfg(test)]
mod tests {
    use super::*;
    use htop_gear_core::{ProcessId, Timestamp};

    fn runner(status: RunnerStatus, cpu: f32, mem: f32, aggressive: bool) -> RunnerSnapshot {
        RunnerSnapshot {
            pid: ProcessId::new(1),
            name: "proc".to_owned(),
            position: 0.0,
            velocity: 1.0,
            cpu,
            mem,
            raw_state: "R".to_owned(),
            status,
            last_seen: Timestamp::ZERO,
            dead_at: None,
            aggressive,
            obstacle_hit: false,
        }
    }

    #[test]
    fn fixed_statuses_ignore_display_mode() {
        for mode in [DisplayMode::Compact, DisplayMode::Ascii] {
            let dead = sprite_for(&runner(RunnerStatus::Dead, 99.0, 50.0, true), mode);
            let zombie = sprite_for(&runner(RunnerStatus::Zombie, 0.0, 0.0, false), mode);
            let pit = sprite_for(&runner(RunnerStatus::PitStop, 0.0, 0.0, false), mode);
            assert_eq!(dead.rows(), ["X_X"]);
            assert_eq!(zombie.rows(), ["zZ>"]);
            assert_eq!(pit.rows(), ["PIT"]);
        }
    }

    #[test]
    fn compact_vehicle_grows_with_memory() {
        let light = sprite_for(&runner(RunnerStatus::Running, 0.0, 1.0, false), DisplayMode::Compact);
        let medium = sprite_for(&runner(RunnerStatus::Running, 0.0, 7.0, false), DisplayMode::Compact);
        let heavy = sprite_for(&runner(RunnerStatus::Running, 0.0, 13.0, false), DisplayMode::Compact);
        assert_eq!(light.rows(), [RACE_CAR]);
        assert_eq!(medium.rows(), [SUV]);
        assert_eq!(heavy.rows(), [TRUCK]);
    }

    #[test]
    fn compact_vehicle_decorations() {
        let sprite = sprite_for(&runner(RunnerStatus::Running, 75.0, 1.0, true), DisplayMode::Compact);
        assert_eq!(sprite.height(), 1);
        assert!(sprite.rows()[0].starts_with(AGGRESSIVE_PREFIX));
        assert!(sprite.rows()[0].ends_with(EXHAUST));
    }

    #[test]
    fn ascii_vehicle_marks_weight_and_exhaust() {
        let sprite = sprite_for(&runner(RunnerStatus::Running, 71.0, 20.0, true), DisplayMode::Ascii);
        assert_eq!(sprite.height(), ASCII_CAR_HEIGHT);
        assert!(sprite.rows()[0].starts_with("[CHR][P]"));
        assert!(sprite.rows()[ASCII_CAR_HEIGHT - 1].ends_with(">>"));

        let plain = sprite_for(&runner(RunnerStatus::Running, 10.0, 8.0, false), DisplayMode::Ascii);
        assert!(plain.rows()[0].starts_with("[+]"));
        assert!(!plain.rows()[ASCII_CAR_HEIGHT - 1].ends_with(">>"));
    }
}
