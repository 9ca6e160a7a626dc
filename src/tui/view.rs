//! Screen layout and rendering.
//!
//! ```text
//! row 0   > <input buffer>
//! row 1   <title>                  (reversed)
//! row 2.. newest line
//!         ...
//!         oldest kept line
//! ```

use std::collections::VecDeque;

use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::input::LineEditor;
use crate::constants::SCROLLBACK_LINES;

/// Prompt drawn in front of the input buffer.
pub const PROMPT: &str = "> ";

/// Bounded scrollback, newest first.
#[derive(Debug, Default)]
pub struct Scrollback {
    lines: VecDeque<String>,
}

impl Scrollback {
    /// Empty scrollback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line on top, dropping the oldest past the limit.
    pub fn push(&mut self, line: String) {
        self.lines.push_front(line);
        self.lines.truncate(SCROLLBACK_LINES);
    }

    /// Lines from newest to oldest.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of lines kept.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True before the first line arrives.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Draw one frame.
pub fn render(frame: &mut Frame<'_>, editor: &LineEditor, title: &str, scrollback: &Scrollback) {
    let [input_row, title_row, body] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(Line::from(format!("{PROMPT}{}", editor.value()))),
        input_row,
    );
    frame.render_widget(
        Paragraph::new(Line::from(title.to_string()))
            .style(Style::default().add_modifier(Modifier::REVERSED)),
        title_row,
    );

    let lines: Vec<Line<'_>> = scrollback
        .lines()
        .take(usize::from(body.height))
        .map(Line::from)
        .collect();
    frame.render_widget(Paragraph::new(lines), body);

    let cursor = PROMPT.len() + editor.visual_cursor();
    let x = input_row
        .x
        .saturating_add(u16::try_from(cursor).unwrap_or(u16::MAX))
        .min(input_row.right().saturating_sub(1));
    frame.set_cursor_position((x, input_row.y));
}
