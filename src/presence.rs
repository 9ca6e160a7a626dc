//! Users, presence markers, mailboxes and shared history.
//!
//! A [`User`] holds the id of the one connection allowed to act as that
//! name, plus one [`Mailbox`] per counterpart. A mailbox owned by `bob` and
//! keyed by `amy` holds what `amy` left for `bob` and has not been delivered
//! yet. Delivered messages land in the [`History`] of the canonical pair.
//!
//! The [`Registry`] owns both process-wide maps. It is built once by the
//! server and handed to every session as `Arc<Registry>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::command::is_valid_user_name;
use crate::storage::{AppendList, KeyedMap, SharedDeque};

/// Queue of undelivered messages from one counterpart.
pub type Mailbox = SharedDeque<String>;

/// Messages delivered between one pair of users.
pub type History = AppendList<String>;

/// Identifier of one accepted connection.
///
/// Never zero; zero marks "no active connection".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    /// Draw the next id from the process-wide counter.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One user name: presence marker plus per-counterpart mailboxes.
#[derive(Debug, Default)]
pub struct User {
    /// Id of the connection logged in as this user, 0 when nobody is.
    active: AtomicU64,
    pending: KeyedMap<String, Mailbox>,
}

impl User {
    /// Claim this user for `conn`. Fails without side effects if another
    /// connection already holds it.
    pub fn try_acquire(&self, conn: ConnId) -> bool {
        self.active
            .compare_exchange(0, conn.get(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear the marker, but only if `conn` is the holder.
    pub fn release(&self, conn: ConnId) -> bool {
        self.active
            .compare_exchange(conn.get(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Connection currently acting as this user.
    pub fn active(&self) -> Option<ConnId> {
        match self.active.load(Ordering::Acquire) {
            0 => None,
            id => Some(ConnId(id)),
        }
    }

    /// Mailbox of messages `counterpart` left for this user.
    pub fn mailbox(&self, counterpart: &str) -> Arc<Mailbox> {
        self.pending.observe(&counterpart.to_string())
    }

    /// Counterparts with at least one undelivered message, sorted by name.
    ///
    /// Advisory: a listed mailbox may be drained before the caller acts.
    pub fn pending_senders(&self) -> Vec<String> {
        self.pending
            .entries()
            .into_iter()
            .filter(|(_, mailbox)| !mailbox.is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// Unordered user pair, stored as (smaller name, larger name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserPair {
    low: String,
    high: String,
}

impl UserPair {
    /// Build the canonical pair; argument order does not matter.
    pub fn canonical(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// Both names, lower one first.
    pub fn names(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }
}

/// Process-wide user and history maps.
///
/// Entries are created on first reference and live as long as the registry.
#[derive(Debug, Default)]
pub struct Registry {
    users: KeyedMap<String, User>,
    history: KeyedMap<UserPair, History>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `name`, created on first reference.
    pub fn user(&self, name: &str) -> Arc<User> {
        self.users.observe(&name.to_string())
    }

    /// Validate `name` and claim it for `conn`.
    pub fn try_log_in(&self, name: &str, conn: ConnId) -> bool {
        is_valid_user_name(name) && self.user(name).try_acquire(conn)
    }

    /// Release `name` if `conn` holds it.
    pub fn log_out(&self, name: &str, conn: ConnId) -> bool {
        self.user(name).release(conn)
    }

    /// Messages `counterpart` left for `owner`.
    pub fn mailbox_for(&self, owner: &str, counterpart: &str) -> Arc<Mailbox> {
        self.user(owner).mailbox(counterpart)
    }

    /// Shared history for `pair`.
    pub fn history_for(&self, pair: &UserPair) -> Arc<History> {
        self.history.observe(pair)
    }

    /// Names with undelivered messages for `owner`.
    pub fn pending_senders(&self, owner: &str) -> Vec<String> {
        self.user(owner).pending_senders()
    }
}
