//! Terminal state guard for RAII cleanup.
//!
//! Raw mode and the alternate screen are restored when the guard drops,
//! including during a panic unwind, so a crashed client never leaves the
//! user's shell unusable.

use std::io::stdout;

use anyhow::{Context, Result};
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Holds the terminal in raw mode on the alternate screen until dropped.
#[derive(Debug)]
pub struct TerminalGuard {
    _entered: (),
}

impl TerminalGuard {
    /// Switch the terminal into raw mode and the alternate screen.
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        // From here on, Drop undoes whatever was applied.
        let guard = Self { _entered: () };
        execute!(stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best effort: there is nowhere to report a failure here.
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen, cursor::Show);
    }
}
