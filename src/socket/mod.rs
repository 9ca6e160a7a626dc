//! TCP wire protocol shared by the chat server and client.
//!
//! Sessions run one OS thread per connection over **non-blocking** sockets.
//! There is no event loop: a transfer that hits `WouldBlock` sleeps for
//! [`IO_RECOVERY_INTERVAL`](crate::constants::IO_RECOVERY_INTERVAL) and retries,
//! while every other I/O error (or a raised cancellation flag) aborts.
//!
//! # Wire Protocol
//!
//! Length-prefixed frames: `[u32 BE length][payload]`
//!
//! A zero length prefix means "no message" and is never sent for a real
//! message. See [`framing`] for the codec and [`transfer`] for the
//! retrying send/receive loops. Nothing above this module ever sees a
//! partial frame.
//!
//! ```text
//! Session thread                          Peer
//! ┌──────────────────┐   frames over    ┌──────────────────┐
//! │ send_message ────┼──── TcpStream ──►│ recv_message     │
//! │ recv_message ◄───┼──────────────────┼─ send_message    │
//! └──────────────────┘                  └──────────────────┘
//! ```

pub mod framing;
pub mod transfer;

pub use transfer::{recv_message, recv_message_at_boundary, send_message};

use std::io;

use thiserror::Error;

use crate::constants::MAX_FRAME_SIZE;

/// Why a frame could not be transferred.
///
/// Only [`WireError::Cancelled`] is caused locally; every other variant means
/// the connection is no longer usable for framed traffic.
#[derive(Debug, Error)]
pub enum WireError {
    /// A zero length prefix was read, or an empty payload was offered for sending.
    #[error("zero-length frame (no message)")]
    Empty,

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// The cancellation flag was raised before the transfer completed.
    #[error("transfer cancelled")]
    Cancelled,

    /// The frame exceeds the size limit.
    #[error("frame too large: {0} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge(usize),

    /// Unrecoverable socket error.
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Returns `true` when the transfer stopped because of the local
    /// cancellation flag rather than a broken connection.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Returns `true` for I/O errors that only mean "not ready yet".
pub(crate) fn is_recoverable(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}
