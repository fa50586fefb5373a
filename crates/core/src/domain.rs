use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// Opaque identifier of a directory principal (a Slack user id such as
/// `U0123ABCD`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One denormalized side of a praise edge. In a `received` list the
/// counterpart is the giver; in a `given` list it is the recipient. The
/// mirrored entry on the other user's ledger carries the same message and
/// timestamp.
///
/// Timestamps are local wall-clock time without an offset, matching the
/// snapshot document format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PraiseEntry {
    pub counterpart: UserId,
    pub message: String,
    pub timestamp: NaiveDateTime,
}

/// Per-user praise history. Both lists are append-only and
/// insertion-ordered; timestamps never decrease within a list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserLedger {
    pub received: Vec<PraiseEntry>,
    pub given: Vec<PraiseEntry>,
}

impl UserLedger {
    /// A user whose two lists are both empty is indistinguishable from an
    /// absent user and is never persisted.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty() && self.given.is_empty()
    }
}

/// The full ledger set, keyed by user. A `BTreeMap` keeps iteration and
/// serialization order deterministic.
pub type Ledgers = BTreeMap<UserId, UserLedger>;
