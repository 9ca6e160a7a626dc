//! Boundary between the client session and whatever draws the screen.
//!
//! The session only needs two queues, a title cell and the shared
//! cancellation flag. A [`Frontend`] consumes the same [`UiLink`] on its own
//! thread: it drains `to_screen`, fills `from_keyboard` with submitted lines
//! and renders `title`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::constants::UI_POLL_INTERVAL;
use crate::storage::{SharedDeque, ValueCell};

/// Shared primitives between a client session and its frontend.
#[derive(Debug, Clone)]
pub struct UiLink {
    /// Lines for the scrollback, oldest first.
    pub to_screen: Arc<SharedDeque<String>>,
    /// Lines the user submitted, oldest first.
    pub from_keyboard: Arc<SharedDeque<String>>,
    /// Panel title.
    pub title: Arc<ValueCell<String>>,
    /// Raised to stop both the session and the frontend.
    pub cancel: Arc<AtomicBool>,
}

impl UiLink {
    /// Fresh queues around `title` and the shared `cancel` flag.
    pub fn new(title: String, cancel: Arc<AtomicBool>) -> Self {
        Self {
            to_screen: Arc::default(),
            from_keyboard: Arc::default(),
            title: Arc::new(ValueCell::new(title)),
            cancel,
        }
    }

    /// Queue a line for display.
    pub fn show(&self, line: impl Into<String>) {
        self.to_screen.push_back(line.into());
    }

    /// Queue a typed line, as if the user submitted it.
    pub fn submit(&self, line: impl Into<String>) {
        self.from_keyboard.push_back(line.into());
    }

    /// True once either side asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Stop the session and the frontend.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait for the next submitted line.
    ///
    /// Returns `None` once the link is cancelled.
    pub fn next_line(&self) -> Option<String> {
        self.next_line_until(&AtomicBool::new(false))
    }

    /// Wait for the next submitted line, giving up when `stop` or the link
    /// is cancelled.
    pub fn next_line_until(&self, stop: &AtomicBool) -> Option<String> {
        loop {
            if stop.load(Ordering::SeqCst) || self.is_cancelled() {
                return None;
            }
            if let Some(line) = self.from_keyboard.try_pop_front() {
                return Some(line);
            }
            thread::sleep(UI_POLL_INTERVAL);
        }
    }

    /// Take everything queued for display.
    pub fn drain_screen(&self) -> Vec<String> {
        std::iter::from_fn(|| self.to_screen.try_pop_front()).collect()
    }
}

/// Something that renders a [`UiLink`] and feeds it keystrokes.
pub trait Frontend: Send {
    /// Run until `ui.cancel` is raised. A frontend that cannot start must
    /// raise the flag itself.
    fn run(self: Box<Self>, ui: UiLink);
}

/// Frontend that renders nothing. The caller drives the queues directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessFrontend;

impl Frontend for HeadlessFrontend {
    fn run(self: Box<Self>, _ui: UiLink) {}
}
