//! Matching engine for the trading-pit simulator
//!
//! Price-time priority limit order books, one per market, with a per-user
//! position ledger enforcing a symmetric position cap both before and during
//! matching.
//!
//! **Key invariants:**
//! - Strict FIFO within a price level, strict price priority across levels
//! - Trades execute at the resting maker's price
//! - Position quantities and cash sum to zero across all users of a market
//! - No empty price level survives a mutation

pub mod book;
pub mod ledger;
pub mod market;
pub mod matching;

pub use market::Market;
