//! Terminal ownership: raw mode, cursor visibility, redraws and key polling.

use std::{
    env,
    io::{self, Stdout, Write},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use htop_gear_core::TrackWidth;
use htop_gear_rendering::{Frame, RenderingBackend};

/// Interactive terminal session restored on drop.
pub(crate) struct TerminalSession {
    stdout: Stdout,
}

impl TerminalSession {
    pub(crate) fn start() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, Hide, Clear(ClearType::All)) {
            let _ = disable_raw_mode();
            return Err(err).context("failed to prepare terminal");
        }
        Ok(Self { stdout })
    }

    /// Waits up to `timeout`, returning `true` once the user asked to quit.
    pub(crate) fn wait_for_quit(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            if !event::poll(remaining).context("failed to poll terminal events")? {
                return Ok(false);
            }
            if let Event::Key(key) = event::read().context("failed to read terminal event")? {
                if is_quit(key) {
                    return Ok(true);
                }
            }
        }
    }
}

impl RenderingBackend for TerminalSession {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let (columns, rows) = terminal::size().context("failed to query terminal size")?;
        queue!(self.stdout, MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, line) in frame.lines().iter().take(usize::from(rows)).enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(
                self.stdout,
                MoveTo(0, row),
                Print(line.clipped(usize::from(columns)).to_ansi())
            )?;
        }
        self.stdout.flush().context("failed to flush frame")?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(err) = execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0), Show) {
            tracing::error!(?err, "failed to restore cursor");
        }
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
    }
}

/// Writes uncolored frames one after another, for runs without a terminal.
pub(crate) struct PlainTextBackend<W> {
    out: W,
}

impl<W: Write> PlainTextBackend<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RenderingBackend for PlainTextBackend<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        writeln!(self.out, "{}\n", frame.to_plain_text()).context("failed to write frame")?;
        self.out.flush().context("failed to flush frame")?;
        Ok(())
    }
}

fn is_quit(key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    matches!(
        (key.code, key.modifiers),
        (KeyCode::Esc, _)
            | (KeyCode::Char('q') | KeyCode::Char('Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL)
    )
}

/// Track width for the current terminal, recomputed every tick.
pub(crate) fn detect_track_width() -> TrackWidth {
    let columns = env::var("COLUMNS")
        .ok()
        .and_then(|value| parse_columns(&value))
        .or_else(|| terminal::size().ok().map(|(columns, _)| u32::from(columns)))
        .unwrap_or(TrackWidth::DEFAULT_TERMINAL_COLUMNS);
    TrackWidth::from_terminal_columns(columns)
}

fn parse_columns(value: &str) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|columns| *columns > TrackWidth::GUTTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use htop_gear_core::{DisplayMode, LaneView, ObstacleSet};
    use htop_gear_rendering::{compose, Scene};

    #[test]
    fn quit_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(press(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(press(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn released_keys_are_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(!is_quit(key));
    }

    #[test]
    fn columns_override_requires_room_for_gutter() {
        assert_eq!(parse_columns("120"), Some(120));
        assert_eq!(parse_columns(" 80 "), Some(80));
        assert_eq!(parse_columns("40"), None);
        assert_eq!(parse_columns("wide"), None);
    }

    #[test]
    fn plain_backend_writes_uncolored_frames() {
        let lanes = LaneView::default();
        let frame = compose(&Scene {
            lanes: &lanes,
            obstacles: &ObstacleSet::new(),
            track: TrackWidth::new(30),
            frame_index: 0,
            aggressive_mode: true,
            display_mode: DisplayMode::Compact,
        });

        let mut backend = PlainTextBackend::new(Vec::new());
        backend.present(&frame).expect("write to memory");
        let written = String::from_utf8(backend.out).expect("utf8");
        assert!(written.starts_with("HTop Gear - 0 runners alive | aggressive mode: on"));
        assert!(!written.contains('\u{1b}'));
        assert!(written.ends_with("\n\n"));
    }
}
