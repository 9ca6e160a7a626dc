//! Server side of one connection.
//!
//! Chat is store-and-forward. What the user types is deposited into the
//! opponent's mailbox under the user's name; what the opponent left for the
//! user is popped from the user's own mailbox and relayed to the socket.
//! The server never writes one user's text straight to another's socket.
//!
//! ```text
//!            socket ──recv──► mailbox_for(opponent, me)   (receiver thread)
//! mailbox_for(me, opponent) ──pop──► socket ──► history   (relay loop)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::command::Command;
use crate::constants::{CHAT_POLL_INTERVAL, END_OF_CHAT_TOKEN, TERMINATION_TOKEN};
use crate::presence::{ConnId, Registry, UserPair};
use crate::session::{Link, Phase, PhaseHandler, Step};
use crate::socket::WireError;

/// Server role handler for one accepted connection.
#[derive(Debug)]
pub struct ServerSession {
    registry: Arc<Registry>,
    conn: ConnId,
    /// Set only once this connection holds the user's presence marker.
    user: Option<String>,
    opponent: String,
}

impl ServerSession {
    /// Handler for a freshly accepted connection, not yet logged in.
    pub fn new(registry: Arc<Registry>, conn: ConnId) -> Self {
        Self {
            registry,
            conn,
            user: None,
            opponent: String::new(),
        }
    }

    /// Name this session is logged in as, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn send_pending(&self, link: &Link, me: &str) {
        for sender in self.registry.pending_senders(me) {
            if !link.send(&sender) {
                return;
            }
        }
        link.send(TERMINATION_TOKEN);
    }

    fn send_history(&self, link: &Link, me: &str, count: usize, name: &str) {
        let history = self.registry.history_for(&UserPair::canonical(me, name));
        for entry in history.last_n(count) {
            if !link.send(&entry) {
                return;
            }
        }
        link.send(TERMINATION_TOKEN);
    }
}

impl PhaseHandler for ServerSession {
    fn log_in(&mut self, link: &Link) -> Step {
        let Some(name) = link.recv() else {
            return Step::Finish;
        };

        if self.registry.try_log_in(&name, self.conn) {
            log::info!("[server] {}: logged in as {name} ({})", link.peer(), self.conn);
            self.user = Some(name.clone());
            link.send(&name);
            Step::Next(Phase::Command)
        } else {
            log::info!("[server] {}: log in as {name:?} rejected", link.peer());
            link.send(&format!("{name}{TERMINATION_TOKEN}"));
            Step::Finish
        }
    }

    fn command(&mut self, link: &Link) -> Step {
        let Some(me) = self.user.clone() else {
            return Step::Finish;
        };
        let Some(line) = link.recv() else {
            return Step::Finish;
        };

        let command = Command::parse(&line);
        log::debug!("[server] {me}: {}", command.verb());
        match command {
            Command::Pend => {
                self.send_pending(link, &me);
                Step::Next(Phase::Command)
            }
            Command::Hist { count, name } => {
                self.send_history(link, &me, count, &name);
                Step::Next(Phase::Command)
            }
            Command::Chat(opponent) => {
                if link.send(&opponent) {
                    self.opponent = opponent;
                    Step::Next(Phase::Chat)
                } else {
                    Step::Finish
                }
            }
            Command::Quit => Step::Finish,
            Command::Help | Command::Bad => {
                log::warn!(
                    "[server] {}: unexpected {} command from {me}, closing session",
                    link.peer(),
                    command.verb()
                );
                Step::Finish
            }
        }
    }

    fn chat(&mut self, link: &Link) -> Step {
        let Some(me) = self.user.clone() else {
            return Step::Finish;
        };
        let opponent = self.opponent.clone();
        log::info!("[chat] {me} -> {opponent} started");

        let outbox = self.registry.mailbox_for(&opponent, &me);
        let inbox = self.registry.mailbox_for(&me, &opponent);
        let history = self.registry.history_for(&UserPair::canonical(&me, &opponent));
        let chat_done = AtomicBool::new(false);
        let session = link.flag();

        thread::scope(|scope| {
            scope.spawn(|| {
                while !chat_done.load(Ordering::SeqCst) && !session.load(Ordering::SeqCst) {
                    match link.recv_until(&chat_done) {
                        Ok(message) if message == END_OF_CHAT_TOKEN => break,
                        Ok(message) => outbox.push_back(message),
                        Err(WireError::Cancelled) => break,
                        Err(e) => {
                            log::debug!("[chat] {me}: receive failed: {e}");
                            link.mark_failed();
                            break;
                        }
                    }
                }
                chat_done.store(true, Ordering::SeqCst);
            });

            while !chat_done.load(Ordering::SeqCst) && !link.is_failed() {
                let Some(message) = inbox.try_pop_front() else {
                    thread::sleep(CHAT_POLL_INTERVAL);
                    continue;
                };
                // A started frame is always finished; only the session flag
                // may abort it.
                if !link.send(&message) {
                    log::debug!("[chat] {me}: relay failed, message requeued");
                    inbox.push_front(message);
                    break;
                }
                history.append(message);
            }

            chat_done.store(true, Ordering::SeqCst);
        });

        log::info!("[chat] {me} -> {opponent} ended");
        Step::Next(Phase::Command)
    }

    fn teardown(&mut self, link: &Link, last: Phase) {
        if let Some(me) = self.user.take() {
            self.registry.log_out(&me, self.conn);
            log::info!("[server] {}: {me} logged out in {last}", link.peer());
        }
    }
}
