//! Client side of the session: turns typed lines into protocol traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use super::ui::{Frontend, UiLink};
use crate::command::Command;
use crate::constants::{END_OF_CHAT_TOKEN, TERMINATION_TOKEN};
use crate::session::{Link, Phase, PhaseHandler, Step};
use crate::socket::WireError;

/// Local help listing, never sent to the server.
pub const HELP_LINES: [&str; 6] = [
    "help: shows all commands with short description.",
    "hist # user_name: receive up to 10 last messages with the user.",
    "chat user_name: opens chat with a user, user could be offline.",
    "     Enter <$> to escape chat.",
    "pend: shows users with messages waiting to be delivered.",
    "quit: exits the program.",
];

/// Shown for lines that do not parse.
pub const UNKNOWN_COMMAND: &str = "Entered command is not recognized.";

/// Default panel title for `name`.
pub fn base_title(name: &str) -> String {
    format!("cchat as {name}")
}

/// Client role handler.
pub struct ClientSession {
    name: String,
    ui: UiLink,
    frontend: Option<Box<dyn Frontend>>,
    ui_thread: Option<JoinHandle<()>>,
    rejected: bool,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("name", &self.name)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

impl ClientSession {
    /// `ui.cancel` must be the same flag the session's [`Link`] carries.
    pub fn new(name: String, ui: UiLink, frontend: Box<dyn Frontend>) -> Self {
        Self {
            name,
            ui,
            frontend: Some(frontend),
            ui_thread: None,
            rejected: false,
        }
    }

    /// True if the server refused the log in.
    pub fn was_rejected(&self) -> bool {
        self.rejected
    }

    fn start_frontend(&mut self) -> bool {
        let Some(frontend) = self.frontend.take() else {
            return true;
        };
        let ui = self.ui.clone();
        match thread::Builder::new()
            .name("ui".to_string())
            .spawn(move || frontend.run(ui))
        {
            Ok(handle) => {
                self.ui_thread = Some(handle);
                true
            }
            Err(e) => {
                log::error!("[client] cannot start frontend: {e}");
                false
            }
        }
    }

    /// Show every response up to the termination token.
    fn relay_sequence(&self, link: &Link) {
        while let Some(message) = link.recv() {
            if message == TERMINATION_TOKEN {
                break;
            }
            self.ui.show(message);
        }
    }
}

impl PhaseHandler for ClientSession {
    fn log_in(&mut self, link: &Link) -> Step {
        if !link.send(&self.name) {
            return Step::Finish;
        }
        // No reply at all is a lost connection, not a refusal.
        let Some(reply) = link.recv() else {
            log::warn!("[client] connection lost during log in as {}", self.name);
            return Step::Finish;
        };
        if reply != self.name {
            log::warn!("[client] log in as {} rejected", self.name);
            self.rejected = true;
            return Step::Finish;
        }

        log::info!("[client] logged in as {}", self.name);
        if !self.start_frontend() {
            link.mark_failed();
            return Step::Finish;
        }
        Step::Next(Phase::Command)
    }

    fn command(&mut self, link: &Link) -> Step {
        let Some(line) = self.ui.next_line() else {
            return Step::Finish;
        };
        self.ui.show(line.clone());

        match Command::parse(&line) {
            Command::Help => {
                for help in HELP_LINES {
                    self.ui.show(help);
                }
                Step::Next(Phase::Command)
            }
            Command::Pend | Command::Hist { .. } => {
                if link.send(&line) {
                    self.relay_sequence(link);
                }
                Step::Next(Phase::Command)
            }
            Command::Chat(opponent) => {
                if !link.send(&line) {
                    return Step::Finish;
                }
                let Some(reply) = link.recv() else {
                    return Step::Finish;
                };
                if reply == opponent {
                    let title = self.ui.title.load();
                    self.ui.title.store(format!("{title} with {reply}"));
                }
                Step::Next(Phase::Chat)
            }
            Command::Quit => {
                link.send(&line);
                Step::Finish
            }
            Command::Bad => {
                self.ui.show(UNKNOWN_COMMAND);
                Step::Next(Phase::Command)
            }
        }
    }

    fn chat(&mut self, link: &Link) -> Step {
        let chat_done = AtomicBool::new(false);
        let ui = &self.ui;
        let name = &self.name;

        thread::scope(|scope| {
            scope.spawn(|| {
                while !chat_done.load(Ordering::SeqCst) && !link.is_failed() {
                    match link.recv_until(&chat_done) {
                        Ok(message) if message == END_OF_CHAT_TOKEN => break,
                        Ok(message) => ui.show(message),
                        Err(WireError::Cancelled) => break,
                        Err(e) => {
                            log::debug!("[chat] {name}: receive failed: {e}");
                            link.mark_failed();
                            break;
                        }
                    }
                }
                chat_done.store(true, Ordering::SeqCst);
            });

            while let Some(line) = ui.next_line_until(&chat_done) {
                let leaving = line == END_OF_CHAT_TOKEN;
                let message = if leaving {
                    line
                } else {
                    format!("[{name}] {line}")
                };
                ui.show(message.clone());
                if !link.send(&message) || leaving {
                    break;
                }
            }

            chat_done.store(true, Ordering::SeqCst);
        });

        self.ui.title.store(base_title(&self.name));
        Step::Next(Phase::Command)
    }

    fn teardown(&mut self, _link: &Link, _last: Phase) {
        self.ui.request_cancel();
        if let Some(handle) = self.ui_thread.take() {
            if handle.join().is_err() {
                log::error!("[client] frontend thread panicked");
            }
        }
    }
}
