//! Chat client: connects to a server and runs one client session.
//!
//! ```text
//! Client::connect ──► Client::run(frontend)
//!                        ├── session thread: drive(Link, ClientSession)
//!                        └── ui thread:      frontend.run(UiLink)
//! ```

pub mod session;
pub mod ui;

pub use session::ClientSession;
pub use ui::{Frontend, HeadlessFrontend, UiLink};

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ClientConfig;
use crate::session::{drive, Link};

/// How a client run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server refused the name.
    Rejected,
    /// The session ran and ended (quit, cancel or disconnect).
    Ended,
}

/// Connected client, ready to run.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    name: String,
    ui: UiLink,
}

impl Client {
    /// Connect (blocking), then switch the stream to non-blocking mode.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let addr = config.server_addr();
        let stream =
            TcpStream::connect(addr).with_context(|| format!("Failed to connect to {addr}"))?;
        Self::from_stream(stream, config.name.clone())
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, name: String) -> Result<Self> {
        stream
            .set_nonblocking(true)
            .context("Failed to make connection non-blocking")?;
        let ui = UiLink::new(session::base_title(&name), Arc::new(AtomicBool::new(false)));
        Ok(Self { stream, name, ui })
    }

    /// Handle to the queues and flag the session will use.
    pub fn ui(&self) -> UiLink {
        self.ui.clone()
    }

    /// Run the session on the calling thread until it ends.
    pub fn run(self, frontend: Box<dyn Frontend>) -> Outcome {
        let link = Link::new(self.stream, Arc::clone(&self.ui.cancel));
        let mut session = ClientSession::new(self.name, self.ui, frontend);
        drive(link, &mut session);

        if session.was_rejected() {
            Outcome::Rejected
        } else {
            Outcome::Ended
        }
    }
}
