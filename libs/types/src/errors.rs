//! Rejection and command error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason an order placement was refused.
///
/// Sent to the caller only, as the `reason` field of an order reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Placement would push the absolute position past the market cap
    PosLimit,
}

/// Errors reported back to a caller on create/join acks.
///
/// The display strings are the wire-visible error messages. Everything else
/// (bad role, closed market, malformed payload) is dropped silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Bad password")]
    BadPassword,

    #[error("Code must be 4 digits")]
    BadCode,

    #[error("Game not found")]
    GameNotFound,
}
