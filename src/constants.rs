//! Application-wide constants for cchat.
//!
//! This module centralizes all magic numbers and protocol tokens so the
//! wire layer, the sessions and the terminal frontend agree on them.
//!
//! # Categories
//!
//! - **Protocol**: control tokens and frame limits
//! - **Polling**: retry and poll intervals for the thread-per-connection model
//! - **Commands**: grammar limits
//! - **UI**: scrollback and input sizes
//! - **Logging**: batched log writer cadence

use std::time::Duration;

// ============================================================================
// Protocol
// ============================================================================

/// Ends a multi-message reply sequence (`pend`, `hist`) and marks a
/// rejected login when appended to the echoed name.
pub const TERMINATION_TOKEN: &str = "$";

/// Ends a live chat when sent by either side.
pub const END_OF_CHAT_TOKEN: &str = "<$>";

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_HEADER_LEN: usize = 4;

/// Maximum frame payload size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// ============================================================================
// Polling
// ============================================================================

/// Sleep between attempts when a non-blocking socket reports `WouldBlock`.
pub const IO_RECOVERY_INTERVAL: Duration = Duration::from_millis(50);

/// Relay poll interval while the chat mailbox is empty.
pub const CHAT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Client poll interval while waiting for a typed line.
pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Server accept-loop poll interval (non-blocking listener).
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Commands
// ============================================================================

/// Largest count accepted by `hist <count> <name>`.
pub const MAX_HIST_COUNT: usize = 10;

// ============================================================================
// UI
// ============================================================================

/// Lines kept in the client scrollback.
pub const SCROLLBACK_LINES: usize = 50;

/// Longest line the input editor accepts.
pub const MAX_INPUT_CHARS: usize = 31;

/// Terminal frontend key poll timeout (one frame).
pub const FRAME_POLL_TIMEOUT: Duration = Duration::from_millis(100);

// ============================================================================
// Logging
// ============================================================================

/// Maximum log entries written per flush.
pub const LOG_BATCH_SIZE: usize = 10;

/// Delay between log flushes.
pub const LOG_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
