//! TUI - Terminal User Interface for the chat client.
//!
//! Runs on its own thread and talks to the client session only through a
//! [`UiLink`]: lines queued for the screen are moved into the scrollback,
//! submitted lines are queued for the session, and Ctrl-C raises the shared
//! cancellation flag.
//!
//! # Modules
//!
//! - [`guard`] - Terminal state RAII guard for cleanup
//! - [`input`] - Single-line editor for the input row
//! - [`view`] - Layout, scrollback and rendering

// Rust guideline compliant 2026-02

pub mod guard;
pub mod input;
pub mod view;

#[doc(inline)]
pub use guard::TerminalGuard;
#[doc(inline)]
pub use input::{KeyOutcome, LineEditor};
#[doc(inline)]
pub use view::Scrollback;

use std::io::stdout;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;

use crate::client::{Frontend, UiLink};
use crate::constants::FRAME_POLL_TIMEOUT;

/// Frontend state that survives between frames.
#[derive(Debug, Default)]
pub struct ChatScreen {
    editor: LineEditor,
    scrollback: Scrollback,
}

impl ChatScreen {
    /// Blank screen with an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move queued lines into the scrollback.
    pub fn sync(&mut self, ui: &UiLink) {
        for line in ui.drain_screen() {
            self.scrollback.push(line);
        }
    }

    /// Sync with the session and draw one frame.
    pub fn draw<B>(&mut self, terminal: &mut Terminal<B>, ui: &UiLink) -> Result<()>
    where
        B: Backend,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        self.sync(ui);
        let title = ui.title.load();
        terminal.draw(|frame| view::render(frame, &self.editor, &title, &self.scrollback))?;
        Ok(())
    }

    /// Apply one terminal event.
    pub fn handle_event(&mut self, event: &Event, ui: &UiLink) {
        let Event::Key(key) = event else {
            return;
        };
        match self.editor.handle_key(*key) {
            KeyOutcome::Edited => {}
            KeyOutcome::Submit(line) => ui.submit(line),
            KeyOutcome::Cancel => {
                log::info!("[tui] Ctrl-C, stopping client");
                ui.request_cancel();
            }
        }
    }

    /// Lines shown so far.
    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }
}

/// Full-screen crossterm frontend.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalFrontend;

impl Frontend for TerminalFrontend {
    fn run(self: Box<Self>, ui: UiLink) {
        if let Err(e) = run_terminal(&ui) {
            log::error!("[tui] {e:#}");
            ui.request_cancel();
        }
    }
}

fn run_terminal(ui: &UiLink) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout())).context("Failed to create terminal")?;
    let mut screen = ChatScreen::new();

    while !ui.is_cancelled() {
        screen.draw(&mut terminal, ui)?;
        if event::poll(FRAME_POLL_TIMEOUT).context("Failed to poll terminal events")? {
            let event = event::read().context("Failed to read terminal event")?;
            screen.handle_event(&event, ui);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_submitted_line_reaches_session() {
        let ui = UiLink::new("cchat as amy".into(), Arc::default());
        let mut screen = ChatScreen::new();
        for c in "pend".chars() {
            screen.handle_event(&press(KeyCode::Char(c)), &ui);
        }
        screen.handle_event(&press(KeyCode::Enter), &ui);
        assert_eq!(ui.from_keyboard.try_pop_front().as_deref(), Some("pend"));
    }

    #[test]
    fn test_ctrl_c_raises_flag() {
        let ui = UiLink::new(String::new(), Arc::default());
        let mut screen = ChatScreen::new();
        screen.handle_event(
            &Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            &ui,
        );
        assert!(ui.is_cancelled());
    }

    #[test]
    fn test_draw_pulls_screen_queue_and_title() {
        let ui = UiLink::new("cchat as amy".into(), Arc::default());
        ui.show("pend");
        ui.show("bob");
        ui.title.store("cchat as amy with bob".into());

        let mut terminal = Terminal::new(TestBackend::new(30, 5)).unwrap();
        let mut screen = ChatScreen::new();
        screen.draw(&mut terminal, &ui).unwrap();

        assert_eq!(screen.scrollback().len(), 2);
        assert!(ui.to_screen.is_empty());
        let buffer = terminal.backend().buffer();
        let title: String = (0..30).map(|x| buffer[(x, 1)].symbol()).collect();
        assert_eq!(title.trim_end(), "cchat as amy with bob");
        let newest: String = (0..30).map(|x| buffer[(x, 2)].symbol()).collect();
        assert_eq!(newest.trim_end(), "bob");
    }
}
