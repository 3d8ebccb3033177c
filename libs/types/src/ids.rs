//! Identifier types for sessions, connections, and orders
//!
//! Connection ids use UUID v7 for time-sortable ordering. Order ids are
//! session-local monotonic integers assigned at acceptance, so the id order
//! mirrors time priority within a session.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one transport connection.
///
/// Positions, resting orders, and user stats are keyed by this id. A
/// reconnecting client receives a fresh ConnId and therefore a fresh ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(Uuid);

impl ConnId {
    /// Create a new ConnId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// First four hex characters, used for default player display names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..4].to_string()
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four-digit join code identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(String);

impl GameCode {
    /// Parse a join code. Must be exactly four ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// Get the code string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    /// Create from a raw sequence value
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw sequence value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic order id source, one per session.
///
/// An id is consumed only when a placement passes its pre-checks, so
/// rejected orders do not leave gaps.
#[derive(Debug)]
pub struct OrderSeq {
    next: u64,
}

impl OrderSeq {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Take the next order id (monotonically increasing)
    pub fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}

impl Default for OrderSeq {
    fn default() -> Self {
        Self::new()
    }
}
