//! Order side and order record
//!
//! Buy and sell differ only in which book map is theirs, the cross
//! predicate, the best-price selector, and the sign of the position delta.
//! Those four facts live on `Side` so the match loop is written once.

use crate::ids::{ConnId, OrderId};
use crate::numeric::Price;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed direction applied to a position (+1 for buy, -1 for sell)
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// Whether an aggressor priced at `own` crosses a resting level at `level`.
    ///
    /// A buyer crosses any ask at or below its price; a seller crosses any
    /// bid at or above its price.
    pub fn crosses(&self, own: Price, level: Price) -> bool {
        match self {
            Side::Buy => own >= level,
            Side::Sell => own <= level,
        }
    }
}

/// A limit order. Lives in a price level while `leaves > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: ConnId,
    pub side: Side,
    /// Tick-snapped limit price
    pub price: Price,
    /// Original quantity
    pub qty: u64,
    /// Unfilled remainder, monotonically decreasing
    pub leaves: u64,
    /// Acceptance timestamp, milliseconds since epoch
    pub ts: i64,
}

impl Order {
    pub fn new(id: OrderId, user: ConnId, side: Side, price: Price, qty: u64, ts: i64) -> Self {
        Self {
            id,
            user,
            side,
            price,
            qty,
            leaves: qty,
            ts,
        }
    }

    /// Reduce `leaves` by a fill.
    ///
    /// # Panics
    /// Panics if the fill exceeds the unfilled remainder.
    pub fn fill(&mut self, qty: u64) {
        assert!(qty <= self.leaves, "fill exceeds leaves");
        self.leaves -= qty;
    }

    pub fn is_filled(&self) -> bool {
        self.leaves == 0
    }
}
