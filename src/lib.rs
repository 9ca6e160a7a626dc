//! cchat - terminal chat with offline mailboxes.
//!
//! A server keeps one presence marker per user name and a mailbox per
//! (owner, counterpart) pair. Clients log in, issue commands and chat; text
//! typed while the other side is away waits in their mailbox until they open
//! the chat.
//!
//! # Architecture
//!
//! - **Wire** - length-prefixed frames over non-blocking TCP, with
//!   sleep-and-retry on `WouldBlock` ([`socket`])
//! - **Session** - LOG_IN / COMMAND / CHAT driver shared by both roles
//!   ([`session`]), with role handlers in [`server`] and [`client`]
//! - **State** - lock-per-container primitives ([`storage`]) and the
//!   user/mailbox/history registry ([`presence`])
//! - **TUI** - optional ratatui frontend for the client ([`tui`])
//!
//! # Modules
//!
//! - [`command`] - Command grammar
//! - [`config`] - CLI/env configuration
//! - [`constants`] - Protocol tokens, intervals and limits
//! - [`logging`] - Batched log sink for `env_logger`

pub mod client;
pub mod command;
pub mod config;
pub mod constants;
pub mod logging;
pub mod presence;
pub mod server;
pub mod session;
pub mod socket;
pub mod storage;
pub mod tui;

// Re-export commonly used types
pub use client::{Client, Outcome};
pub use command::Command;
pub use config::{ClientConfig, ServerConfig};
pub use presence::Registry;
pub use server::Server;
