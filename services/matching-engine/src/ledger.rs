//! Per-user position and cash ledger
//!
//! Positions are created lazily on first fill. Only matching mutates the
//! ledger; cancels and settlements never touch it. Every fill moves qty and
//! cash symmetrically between buyer and seller, so both columns sum to zero
//! across a market.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use types::ids::ConnId;
use types::numeric::Price;
use types::order::Side;

/// Signed position for one user in one market.
///
/// `qty` positive means long; `cash` negative means net spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub qty: i64,
    pub cash: Decimal,
}

/// All positions for one market, keyed by connection id.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<ConnId, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, zero if the user has never traded here.
    pub fn position(&self, user: ConnId) -> Position {
        self.positions.get(&user).copied().unwrap_or_default()
    }

    /// Whether `user` can add `inc_qty` in `side`'s direction without the
    /// absolute position passing `pos_limit`.
    pub fn check_limit(&self, user: ConnId, side: Side, inc_qty: u64, pos_limit: u64) -> bool {
        let projected = self.position(user).qty + side.sign() * inc_qty as i64;
        projected.unsigned_abs() <= pos_limit
    }

    /// Apply one fill of `qty` at `price` to both counterparties.
    ///
    /// Buyer gains qty and pays cash; seller mirrors. A self-trade nets to
    /// zero on both columns.
    pub fn apply_fill(&mut self, buyer: ConnId, seller: ConnId, price: Price, qty: u64) {
        let notional = price.notional(qty);
        let q = qty as i64;

        let b = self.positions.entry(buyer).or_default();
        b.qty += q;
        b.cash -= notional;

        let s = self.positions.entry(seller).or_default();
        s.qty -= q;
        s.cash += notional;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnId, &Position)> {
        self.positions.iter()
    }
}
