//! Market container
//!
//! One book plus its metadata: lifecycle flags, tick, position cap, trade
//! tape, and per-user volume stats. Every execution path funnels through
//! `record`, which is the single writer for the tape and stats.

use crate::book::{Book, LevelView};
use crate::ledger::{Position, PositionLedger};
use crate::matching;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use types::errors::RejectReason;
use types::ids::{ConnId, OrderSeq};
use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::Trade;

pub use crate::matching::{Placed, Taken};

/// Recent-trade ring capacity.
pub const TAPE_CAP: usize = 1000;

/// Running totals of one user's executed volume in a market.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub buy_vol: u64,
    pub buy_notional: Decimal,
    pub sell_vol: u64,
    pub sell_notional: Decimal,
}

impl UserStats {
    /// Average buy price, zero with no buys
    pub fn avg_buy(&self) -> Decimal {
        if self.buy_vol == 0 {
            Decimal::ZERO
        } else {
            self.buy_notional / Decimal::from(self.buy_vol)
        }
    }

    /// Average sell price, zero with no sells
    pub fn avg_sell(&self) -> Decimal {
        if self.sell_vol == 0 {
            Decimal::ZERO
        } else {
            self.sell_notional / Decimal::from(self.sell_vol)
        }
    }
}

/// One independently priced instrument inside a session.
#[derive(Debug, Clone)]
pub struct Market {
    symbol: String,
    tick: Decimal,
    pos_limit: u64,
    open: bool,
    settlement: Option<Price>,
    click_size: u64,
    book: Book,
    ledger: PositionLedger,
    tape: VecDeque<Trade>,
    stats: HashMap<ConnId, UserStats>,
}

impl Market {
    pub const DEFAULT_TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1
    pub const DEFAULT_POS_LIMIT: u64 = 100;
    pub const DEFAULT_CLICK_SIZE: u64 = 1;

    pub fn new(symbol: impl Into<String>, tick: Decimal, pos_limit: u64) -> Self {
        Self {
            symbol: symbol.into(),
            tick,
            pos_limit,
            open: true,
            settlement: None,
            click_size: Self::DEFAULT_CLICK_SIZE,
            book: Book::new(),
            ledger: PositionLedger::new(),
            tape: VecDeque::new(),
            stats: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tick(&self) -> Decimal {
        self.tick
    }

    pub fn pos_limit(&self) -> u64 {
        self.pos_limit
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn settlement(&self) -> Option<Price> {
        self.settlement
    }

    pub fn click_size(&self) -> u64 {
        self.click_size
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Flip the trading flag. A settled market stays closed.
    pub fn set_open(&mut self, open: bool) {
        self.open = open && self.settlement.is_none();
    }

    /// Settle at a snapped price and close the market. Resting orders stay
    /// on the book (cancellation remains permitted); the ledger is untouched.
    pub fn settle(&mut self, raw: Decimal) -> Price {
        let px = Price::snap(raw, self.tick);
        self.settlement = Some(px);
        self.open = false;
        px
    }

    /// Mark price for implied PnL: settlement if set, else mid, else zero.
    pub fn mark(&self) -> Decimal {
        if let Some(px) = self.settlement {
            px.as_decimal()
        } else {
            self.book.mid().unwrap_or(Decimal::ZERO)
        }
    }

    /// Accept a limit order: cap pre-check, snap, cross, rest the residual.
    ///
    /// The pre-check projects the full quantity onto the caller's position;
    /// a breach rejects before an order id is consumed or any state moves.
    pub fn place_limit(
        &mut self,
        seq: &mut OrderSeq,
        user: ConnId,
        side: Side,
        raw_price: Decimal,
        qty: u64,
        ts: i64,
    ) -> Result<Placed, RejectReason> {
        if !self.ledger.check_limit(user, side, qty, self.pos_limit) {
            return Err(RejectReason::PosLimit);
        }
        let price = Price::snap(raw_price, self.tick);
        let order_id = seq.next_id();
        let mut order = Order::new(order_id, user, side, price, qty, ts);
        let trades = matching::execute_limit(
            &mut self.book,
            &mut self.ledger,
            &self.symbol,
            self.pos_limit,
            &mut order,
        );
        self.record(&trades);
        if order.leaves > 0 {
            self.book.rest(order);
        }
        Ok(Placed { order_id, trades })
    }

    /// Click-to-take against one price level. Returns the quantity filled.
    pub fn take_at_price(
        &mut self,
        user: ConnId,
        side: Side,
        raw_price: Decimal,
        max_qty: u64,
        ts: i64,
    ) -> Taken {
        let price = Price::snap(raw_price, self.tick);
        let trades = matching::execute_take(
            &mut self.book,
            &mut self.ledger,
            &self.symbol,
            self.pos_limit,
            user,
            side,
            price,
            max_qty,
            ts,
        );
        self.record(&trades);
        let filled = trades.iter().map(|t| t.qty).sum();
        Taken { filled, trades }
    }

    /// Pull every order of `user` at (side, price). Returns the count
    /// removed. The ledger is not touched and no trade is emitted.
    pub fn cancel_at_price(&mut self, user: ConnId, side: Side, raw_price: Decimal) -> usize {
        let price = Price::snap(raw_price, self.tick);
        self.book.cancel(user, side, price)
    }

    pub fn position(&self, user: ConnId) -> Position {
        self.ledger.position(user)
    }

    pub fn stats_for(&self, user: ConnId) -> UserStats {
        self.stats.get(&user).cloned().unwrap_or_default()
    }

    /// Recent trades, oldest first, at most `TAPE_CAP`.
    pub fn tape(&self) -> &VecDeque<Trade> {
        &self.tape
    }

    /// Aggregated depth for one side as seen by `viewer`.
    pub fn depth(&self, side: Side, max_levels: usize, viewer: ConnId) -> Vec<LevelView> {
        self.book.depth(side, max_levels, viewer)
    }

    fn record(&mut self, trades: &[Trade]) {
        for trade in trades {
            if self.tape.len() >= TAPE_CAP {
                self.tape.pop_front();
            }
            self.tape.push_back(trade.clone());

            let notional = trade.notional();
            let buy = self.stats.entry(trade.buyer).or_default();
            buy.buy_vol += trade.qty;
            buy.buy_notional += notional;
            let sell = self.stats.entry(trade.seller).or_default();
            sell.sell_vol += trade.qty;
            sell.sell_notional += notional;
        }
    }
}
