//! Chat server: accept loop and per-connection session threads.
//!
//! The listener runs in non-blocking mode and is polled every
//! [`ACCEPT_POLL_INTERVAL`]. Each accepted connection gets its own thread,
//! its own failure flag and a [`ServerSession`] sharing one [`Registry`].
//!
//! ```text
//! Server::run
//!   ├── accept ──► spawn thread ──► drive(Link, ServerSession)
//!   ├── reap finished threads (every tick)
//!   └── shutdown: raise every session flag, join all
//! ```

pub mod session;

pub use session::ServerSession;

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::config::ServerConfig;
use crate::constants::ACCEPT_POLL_INTERVAL;
use crate::presence::{ConnId, Registry};
use crate::session::{drive, Link};

/// Thread serving one accepted connection.
#[derive(Debug)]
struct SessionThread {
    peer: SocketAddr,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Listening chat server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Server {
    /// Bind `0.0.0.0:<port>`.
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let listener =
            TcpListener::bind(addr).with_context(|| format!("Failed to bind {addr}"))?;
        Self::from_listener(listener)
    }

    /// Serve an already bound listener with a fresh registry.
    pub fn from_listener(listener: TcpListener) -> Result<Self> {
        listener
            .set_nonblocking(true)
            .context("Failed to make listener non-blocking")?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    /// Registry shared by every session of this server.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept and serve connections until `shutdown` is raised.
    ///
    /// On shutdown every live session is cancelled and joined before this
    /// returns.
    pub fn run(self, shutdown: &AtomicBool) -> Result<()> {
        let addr = self.local_addr()?;
        log::info!("[server] listening on {addr}");

        let mut sessions: Vec<SessionThread> = Vec::new();

        while !shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => match self.spawn_session(stream, peer) {
                    Ok(session) => sessions.push(session),
                    Err(e) => log::error!("[server] cannot serve {peer}: {e:#}"),
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log::error!("[server] accept error: {e}");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
            sessions = reap(sessions);
        }

        log::info!("[server] shutting down, {} live session(s)", sessions.len());
        for session in &sessions {
            session.cancel.store(true, Ordering::SeqCst);
        }
        for session in sessions {
            join(session);
        }
        log::info!("[server] stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) -> Result<SessionThread> {
        stream
            .set_nonblocking(true)
            .context("Failed to make connection non-blocking")?;
        log::info!("New connection from peer {peer}");

        let cancel = Arc::new(AtomicBool::new(false));
        let link = Link::new(stream, Arc::clone(&cancel));
        let registry = Arc::clone(&self.registry);
        let conn = ConnId::next();

        let handle = thread::Builder::new()
            .name(format!("session-{}", conn.get()))
            .spawn(move || {
                let mut handler = ServerSession::new(registry, conn);
                drive(link, &mut handler);
            })
            .context("Failed to spawn session thread")?;

        Ok(SessionThread {
            peer,
            cancel,
            handle,
        })
    }
}

/// Join finished sessions, keep the rest.
fn reap(sessions: Vec<SessionThread>) -> Vec<SessionThread> {
    let (finished, live): (Vec<_>, Vec<_>) = sessions
        .into_iter()
        .partition(|session| session.handle.is_finished());
    for session in finished {
        join(session);
    }
    live
}

fn join(session: SessionThread) {
    if session.handle.join().is_err() {
        log::error!("[server] session thread for {} panicked", session.peer);
    }
    log::info!("Closing connection with peer {}", session.peer);
}
