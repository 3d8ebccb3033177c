//! Two-sided order book
//!
//! One `BTreeMap<Price, PriceLevel>` per side. Best bid is the max bid key,
//! best ask the min ask key; which end of the map is "best" comes from the
//! side, so bids and asks share one implementation. Empty levels are deleted
//! as soon as the last order leaves.

pub mod price_level;

pub use price_level::PriceLevel;

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use types::ids::ConnId;
use types::numeric::Price;
use types::order::{Order, Side};

/// One aggregated depth row as seen by a specific viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelView {
    pub price: Price,
    /// Total unfilled quantity at the level
    pub size: u64,
    /// The viewer's share of `size`
    pub my: u64,
}

/// Resting orders for one market, both sides.
#[derive(Debug, Clone, Default)]
pub struct Book {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    fn levels(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Best price on one side: max of bids, min of asks.
    pub fn best(&self, side: Side) -> Option<Price> {
        let levels = self.levels(side);
        match side {
            Side::Buy => levels.keys().next_back().copied(),
            Side::Sell => levels.keys().next().copied(),
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.best(Side::Buy)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.best(Side::Sell)
    }

    /// Midpoint of the touch; one-sided books fall back to the side that
    /// exists.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b.as_decimal() + a.as_decimal()) / Decimal::from(2)),
            (Some(b), None) => Some(b.as_decimal()),
            (None, Some(a)) => Some(a.as_decimal()),
            (None, None) => None,
        }
    }

    /// Rest an order at its own side and price, creating the level if absent.
    pub fn rest(&mut self, order: Order) {
        self.levels_mut(order.side)
            .entry(order.price)
            .or_default()
            .push(order);
    }

    /// The best level on one side, mutable for matching.
    pub fn best_level_mut(&mut self, side: Side) -> Option<(Price, &mut PriceLevel)> {
        let levels = self.levels_mut(side);
        match side {
            Side::Buy => levels.iter_mut().next_back().map(|(p, l)| (*p, l)),
            Side::Sell => levels.iter_mut().next().map(|(p, l)| (*p, l)),
        }
    }

    /// A specific level, mutable. Used by click-to-take.
    pub fn level_mut(&mut self, side: Side, price: Price) -> Option<&mut PriceLevel> {
        self.levels_mut(side).get_mut(&price)
    }

    /// Delete a level outright. Callers use this after draining it.
    pub fn delete_level(&mut self, side: Side, price: Price) {
        self.levels_mut(side).remove(&price);
    }

    /// Remove every order of `user` at (side, price). Returns the count
    /// removed; the level is deleted if now empty.
    pub fn cancel(&mut self, user: ConnId, side: Side, price: Price) -> usize {
        let levels = self.levels_mut(side);
        let Some(level) = levels.get_mut(&price) else {
            return 0;
        };
        let removed = level.remove_user(user);
        if level.is_empty() {
            levels.remove(&price);
        }
        removed
    }

    /// Aggregated depth for one side, best first: bids descending, asks
    /// ascending. At most `max_levels` rows, each with the viewer's own
    /// share broken out.
    pub fn depth(&self, side: Side, max_levels: usize, viewer: ConnId) -> Vec<LevelView> {
        let row = |(price, level): (&Price, &PriceLevel)| LevelView {
            price: *price,
            size: level.total_leaves(),
            my: level.leaves_for(viewer),
        };
        let levels = self.levels(side);
        match side {
            Side::Buy => levels.iter().rev().take(max_levels).map(row).collect(),
            Side::Sell => levels.iter().take(max_levels).map(row).collect(),
        }
    }

    pub fn is_empty(&self, side: Side) -> bool {
        self.levels(side).is_empty()
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.levels(side).len()
    }

    /// Every resting order on one side, for invariant checks.
    pub fn orders(&self, side: Side) -> impl Iterator<Item = &Order> {
        self.levels(side).values().flat_map(|l| l.iter())
    }
}
