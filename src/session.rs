//! Session lifecycle shared by the client and server roles.
//!
//! ```text
//!            ok                chat
//! LOG_IN ──────────► COMMAND ─────────► CHAT
//!    │                 ▲  │               │
//!    │ rejected        │  │ quit/violation│ <$> or disconnect
//!    ▼                 │  ▼               │
//! teardown ◄───────────┴──┴───────────────┘ (failure flag)
//! ```
//!
//! [`drive`] owns the loop. Role behavior lives in a [`PhaseHandler`], one
//! method per phase. The failure flag inside [`Link`] is checked before
//! every transition; once set, the loop goes straight to teardown.

// Rust guideline compliant 2026-02

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::socket::{recv_message, recv_message_at_boundary, send_message, WireError};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user name.
    LogIn,
    /// One command/response unit at a time.
    Command,
    /// Live chat with one opponent.
    Chat,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LogIn => "LOG_IN",
            Self::Command => "COMMAND",
            Self::Chat => "CHAT",
        };
        f.write_str(name)
    }
}

/// What a phase handler wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run this phase next.
    Next(Phase),
    /// End the session.
    Finish,
}

/// One connection plus its failure flag.
///
/// Any wire failure through [`Link::send`] or [`Link::recv`] raises the
/// flag. The same flag cancels transfers in progress, so raising it from
/// another thread stops the session within one retry interval.
#[derive(Debug)]
pub struct Link {
    stream: TcpStream,
    failed: Arc<AtomicBool>,
    peer: String,
}

impl Link {
    /// Wrap an already configured stream.
    pub fn new(stream: TcpStream, failed: Arc<AtomicBool>) -> Self {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
        Self {
            stream,
            failed,
            peer,
        }
    }

    /// Send one message; on failure raise the flag and return false.
    pub fn send(&self, message: &str) -> bool {
        match send_message(&self.stream, message, &self.failed) {
            Ok(()) => true,
            Err(e) => {
                self.fail(&e);
                false
            }
        }
    }

    /// Receive one message; on failure raise the flag and return `None`.
    pub fn recv(&self) -> Option<String> {
        match recv_message(&self.stream, &self.failed) {
            Ok(message) => Some(message),
            Err(e) => {
                self.fail(&e);
                None
            }
        }
    }

    /// Receive the next frame unless `stop` is raised before it starts.
    ///
    /// Used by per-phase receiver threads. `stop` never cuts a frame in
    /// half, so the stream stays in sync for the next phase; only the
    /// session flag aborts mid-frame. Errors are returned without raising
    /// the flag.
    pub fn recv_until(&self, stop: &AtomicBool) -> Result<String, WireError> {
        recv_message_at_boundary(&self.stream, stop, &self.failed)
    }

    /// Raise the failure flag.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    /// True once the session has failed or been cancelled.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Shared handle to the failure flag.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    /// Peer address, for log lines.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn fail(&self, err: &WireError) {
        if !err.is_cancelled() {
            log::debug!("[session] {}: {err}", self.peer);
        }
        self.mark_failed();
    }

    fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Role-specific behavior, one method per phase.
pub trait PhaseHandler {
    /// Exchange identity.
    fn log_in(&mut self, link: &Link) -> Step;

    /// Handle one command/response unit.
    fn command(&mut self, link: &Link) -> Step;

    /// Run a live chat until either side leaves.
    fn chat(&mut self, link: &Link) -> Step;

    /// Release whatever the session acquired. Runs exactly once.
    fn teardown(&mut self, link: &Link, last: Phase);
}

/// Run a session to completion, starting in [`Phase::LogIn`].
///
/// Returns the phase the session was in when it ended. The stream is shut
/// down after teardown and closed when `link` drops.
pub fn drive<H: PhaseHandler + ?Sized>(link: Link, handler: &mut H) -> Phase {
    let mut phase = Phase::LogIn;

    while !link.is_failed() {
        let step = match phase {
            Phase::LogIn => handler.log_in(&link),
            Phase::Command => handler.command(&link),
            Phase::Chat => handler.chat(&link),
        };
        match step {
            // A failed phase is reported as the phase it failed in.
            Step::Next(next) if !link.is_failed() => {
                if next != phase {
                    log::debug!("[session] {}: {phase} -> {next}", link.peer());
                }
                phase = next;
            }
            _ => break,
        }
    }

    let failed = link.is_failed();
    handler.teardown(&link, phase);
    link.shutdown();
    log::info!(
        "[session] {}: done in {phase}{}",
        link.peer(),
        if failed { " (failed)" } else { "" }
    );
    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let a = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (b, _) = listener.accept().unwrap();
        a.set_nonblocking(true).unwrap();
        b.set_nonblocking(true).unwrap();
        (a, b)
    }

    /// Replays a fixed list of steps and records what the driver did.
    struct Scripted {
        steps: Vec<Step>,
        visited: Vec<Phase>,
        teardowns: usize,
        fail_in: Option<Phase>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                visited: Vec::new(),
                teardowns: 0,
                fail_in: None,
            }
        }

        fn next(&mut self, link: &Link, phase: Phase) -> Step {
            self.visited.push(phase);
            if self.fail_in == Some(phase) {
                link.mark_failed();
                return Step::Next(Phase::Command);
            }
            if self.steps.is_empty() {
                Step::Finish
            } else {
                self.steps.remove(0)
            }
        }
    }

    impl PhaseHandler for Scripted {
        fn log_in(&mut self, link: &Link) -> Step {
            self.next(link, Phase::LogIn)
        }

        fn command(&mut self, link: &Link) -> Step {
            self.next(link, Phase::Command)
        }

        fn chat(&mut self, link: &Link) -> Step {
            self.next(link, Phase::Chat)
        }

        fn teardown(&mut self, _link: &Link, _last: Phase) {
            self.teardowns += 1;
        }
    }

    #[test]
    fn test_driver_follows_steps_and_tears_down_once() {
        let (a, _b) = pair();
        let mut handler = Scripted::new(vec![
            Step::Next(Phase::Command),
            Step::Next(Phase::Chat),
            Step::Next(Phase::Command),
            Step::Finish,
        ]);

        let last = drive(Link::new(a, Arc::default()), &mut handler);

        assert_eq!(last, Phase::Command);
        assert_eq!(
            handler.visited,
            vec![Phase::LogIn, Phase::Command, Phase::Chat, Phase::Command]
        );
        assert_eq!(handler.teardowns, 1);
    }

    #[test]
    fn test_failure_flag_short_circuits() {
        let (a, _b) = pair();
        let mut handler = Scripted::new(vec![Step::Next(Phase::Command); 5]);
        handler.fail_in = Some(Phase::Command);

        let last = drive(Link::new(a, Arc::default()), &mut handler);

        assert_eq!(last, Phase::Command);
        assert_eq!(handler.visited, vec![Phase::LogIn, Phase::Command]);
        assert_eq!(handler.teardowns, 1);
    }

    #[test]
    fn test_preset_flag_skips_straight_to_teardown() {
        let (a, _b) = pair();
        let mut handler = Scripted::new(vec![]);

        drive(Link::new(a, Arc::new(AtomicBool::new(true))), &mut handler);

        assert!(handler.visited.is_empty());
        assert_eq!(handler.teardowns, 1);
    }

    #[test]
    fn test_driver_closes_stream() {
        let (a, mut b) = pair();
        let mut handler = Scripted::new(vec![]);
        drive(Link::new(a, Arc::default()), &mut handler);

        b.set_nonblocking(false).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(b.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_link_failure_raises_flag() {
        let (a, b) = pair();
        let link = Link::new(a, Arc::default());
        drop(b);

        assert_eq!(link.recv(), None);
        assert!(link.is_failed());
    }

    #[test]
    fn test_link_round_trip() {
        let (a, b) = pair();
        let left = Link::new(a, Arc::default());
        let right = Link::new(b, Arc::default());

        assert!(left.send("amy"));
        assert_eq!(right.recv().as_deref(), Some("amy"));
        assert!(!left.is_failed());
        assert!(!right.is_failed());
    }

    #[test]
    fn test_recv_until_stops_between_frames_without_failing() {
        let (a, b) = pair();
        let left = Link::new(a, Arc::default());
        let right = Link::new(b, Arc::default());
        let stop = AtomicBool::new(false);

        assert!(left.send("[amy] hi"));
        assert_eq!(right.recv_until(&stop).unwrap(), "[amy] hi");

        stop.store(true, Ordering::SeqCst);
        assert!(left.send("pend"));
        assert!(matches!(right.recv_until(&stop), Err(WireError::Cancelled)));
        assert!(!right.is_failed());
        // The frame left behind is intact for the next phase.
        assert_eq!(right.recv().as_deref(), Some("pend"));
    }
}
