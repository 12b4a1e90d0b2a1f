//! Colored text lines measured in visible columns.

use crossterm::style::{style, Color, Stylize};

/// Run of text sharing a single foreground color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    /// Visible characters of the run.
    pub text: String,
    /// Foreground color, or `None` for the terminal default.
    pub color: Option<Color>,
}

/// One terminal line assembled from colored spans.
///
/// Widths count characters, so every glyph is assumed to occupy one column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyledLine {
    spans: Vec<Span>,
}

impl StyledLine {
    /// Creates an empty line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a line holding uncolored text.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        let mut line = Self::new();
        line.push(text, None);
        line
    }

    /// Appends text drawn in `color`, merging with the previous span when possible.
    pub fn push(&mut self, text: impl Into<String>, color: Option<Color>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.color == color => last.text.push_str(&text),
            _ => self.spans.push(Span { text, color }),
        }
    }

    /// Appends every span of `other`.
    pub fn append(&mut self, other: StyledLine) {
        for span in other.spans {
            self.push(span.text, span.color);
        }
    }

    /// Pads the line with spaces until it is at least `width` columns wide.
    pub fn pad_to(&mut self, width: usize) {
        let missing = width.saturating_sub(self.width());
        if missing > 0 {
            self.push(" ".repeat(missing), None);
        }
    }

    /// Returns a copy cut down to at most `width` columns.
    #[must_use]
    pub fn clipped(&self, width: usize) -> Self {
        let mut clipped = Self::new();
        let mut remaining = width;
        for span in &self.spans {
            if remaining == 0 {
                break;
            }
            let text: String = span.text.chars().take(remaining).collect();
            remaining -= text.chars().count();
            clipped.push(text, span.color);
        }
        clipped
    }

    /// Number of visible columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.spans.iter().map(|span| span.text.chars().count()).sum()
    }

    /// Spans in drawing order.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Text without any color information.
    #[must_use]
    pub fn to_plain(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Text with ANSI color sequences around colored spans.
    #[must_use]
    pub fn to_ansi(&self) -> String {
        self.spans
            .iter()
            .map(|span| match span.color {
                Some(color) => style(span.text.as_str()).with(color).to_string(),
                None => span.text.clone(),
            })
            .collect()
    }
}
