//! Match loops
//!
//! Crosses an aggressor against the opposite side honoring price-time
//! priority. The taker's position cap is re-checked before every fill;
//! a breach truncates the aggressor and leaves the maker untouched. The
//! maker side is never re-checked: makers committed to their exposure when
//! the order rested.

use crate::book::Book;
use crate::ledger::PositionLedger;
use types::ids::{ConnId, OrderId};
use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::Trade;

/// Result of a limit placement.
#[derive(Debug, Clone)]
pub struct Placed {
    pub order_id: OrderId,
    pub trades: Vec<Trade>,
}

/// Result of a click-to-take.
#[derive(Debug, Clone)]
pub struct Taken {
    /// Actual quantity filled
    pub filled: u64,
    pub trades: Vec<Trade>,
}

fn counterparties(taker_side: Side, taker: ConnId, maker: ConnId) -> (ConnId, ConnId) {
    match taker_side {
        Side::Buy => (taker, maker),
        Side::Sell => (maker, taker),
    }
}

/// Cross `order` against the opposite side until it stops crossing, fills,
/// or hits the taker's cap. Fills execute at the resting maker's price.
/// The caller rests any residual.
pub(crate) fn execute_limit(
    book: &mut Book,
    ledger: &mut PositionLedger,
    symbol: &str,
    pos_limit: u64,
    order: &mut Order,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let opp = order.side.opposite();

    while order.leaves > 0 {
        let Some((px, level)) = book.best_level_mut(opp) else {
            break;
        };
        if !order.side.crosses(order.price, px) {
            break;
        }

        while order.leaves > 0 {
            let Some(maker) = level.front_mut() else {
                break;
            };
            let trade_qty = order.leaves.min(maker.leaves);
            if !ledger.check_limit(order.user, order.side, trade_qty, pos_limit) {
                // Truncate: drop the rest of the aggressor, keep the maker.
                order.leaves = 0;
                break;
            }
            let (buyer, seller) = counterparties(order.side, order.user, maker.user);
            ledger.apply_fill(buyer, seller, px, trade_qty);
            maker.fill(trade_qty);
            order.fill(trade_qty);
            trades.push(Trade {
                ts: order.ts,
                symbol: symbol.to_string(),
                price: px,
                qty: trade_qty,
                buyer,
                seller,
            });
            if maker.is_filled() {
                level.pop_front();
            }
        }

        let exhausted = level.is_empty();
        if exhausted {
            book.delete_level(opp, px);
        }
    }

    trades
}

/// Fill against exactly one opposite level at `price`, FIFO, up to
/// `max_qty`. Other levels are never touched; the trade price is the
/// requested level's price.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute_take(
    book: &mut Book,
    ledger: &mut PositionLedger,
    symbol: &str,
    pos_limit: u64,
    user: ConnId,
    side: Side,
    price: Price,
    max_qty: u64,
    ts: i64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let opp = side.opposite();
    let Some(level) = book.level_mut(opp, price) else {
        return trades;
    };

    let mut remaining = max_qty;
    while remaining > 0 {
        let Some(maker) = level.front_mut() else {
            break;
        };
        let trade_qty = remaining.min(maker.leaves);
        if !ledger.check_limit(user, side, trade_qty, pos_limit) {
            break;
        }
        let (buyer, seller) = counterparties(side, user, maker.user);
        ledger.apply_fill(buyer, seller, price, trade_qty);
        maker.fill(trade_qty);
        remaining -= trade_qty;
        trades.push(Trade {
            ts,
            symbol: symbol.to_string(),
            price,
            qty: trade_qty,
            buyer,
            seller,
        });
        if maker.is_filled() {
            level.pop_front();
        }
    }

    let exhausted = level.is_empty();
    if exhausted {
        book.delete_level(opp, price);
    }

    trades
}
