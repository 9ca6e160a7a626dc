//! Single-line editor for the input row.
//!
//! Wraps [`tui_input::Input`] for the buffer and cursor, and caps the line
//! at [`MAX_INPUT_CHARS`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tui_input::{Input, InputRequest};

use crate::constants::MAX_INPUT_CHARS;

/// What a key press asks the frontend to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Buffer changed (or nothing happened); keep going.
    Edited,
    /// A non-empty line was submitted.
    Submit(String),
    /// Ctrl-C: stop the client.
    Cancel,
}

/// Input row state.
#[derive(Debug, Default)]
pub struct LineEditor {
    input: Input,
}

impl LineEditor {
    /// Empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer.
    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Cursor column within the buffer (accounts for wide characters).
    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Apply one key event.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind == KeyEventKind::Release {
            return KeyOutcome::Edited;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c' | 'C') => KeyOutcome::Cancel,
                _ => KeyOutcome::Edited,
            };
        }

        match key.code {
            KeyCode::Enter => {
                if self.input.value().is_empty() {
                    return KeyOutcome::Edited;
                }
                let line = self.input.value().to_string();
                self.input.reset();
                KeyOutcome::Submit(line)
            }
            KeyCode::Backspace => self.request(InputRequest::DeletePrevChar),
            KeyCode::Delete => self.request(InputRequest::DeleteNextChar),
            KeyCode::Left => self.request(InputRequest::GoToPrevChar),
            KeyCode::Right => self.request(InputRequest::GoToNextChar),
            KeyCode::Home => self.request(InputRequest::GoToStart),
            KeyCode::End => self.request(InputRequest::GoToEnd),
            KeyCode::Char(c) if !c.is_control() => {
                if self.input.value().chars().count() < MAX_INPUT_CHARS {
                    self.input.handle(InputRequest::InsertChar(c));
                }
                KeyOutcome::Edited
            }
            _ => KeyOutcome::Edited,
        }
    }

    fn request(&mut self, req: InputRequest) -> KeyOutcome {
        self.input.handle(req);
        KeyOutcome::Edited
    }
}
