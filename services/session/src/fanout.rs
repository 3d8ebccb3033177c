//! Fan-out engine
//!
//! After any state-changing command the dispatcher calls `fan_out` while
//! still holding the session mutex, so every viewer receives a bundle cut
//! from one consistent snapshot. The bundle is recomputed per viewer on
//! every change; at session scale (a classroom) that is cheaper than
//! diffing.

use crate::game::Game;
use crate::hub::ConnectionHub;
use crate::protocol::ServerMessage;
use types::order::Side;

/// Depth rows per side included in a book snapshot.
pub const DEPTH_LEVELS: usize = 200;

/// Push every viewer of `game` their personalized bundle: market meta,
/// recent events, per-market depth/position/summary, and implied PnL.
pub fn fan_out(game: &Game, hub: &ConnectionHub) {
    let meta = game.market_meta();
    let events = game.recent_events();

    for conn in game.viewers() {
        hub.send_to(
            conn,
            ServerMessage::MarketsMeta {
                markets: meta.clone(),
            },
        );
        hub.send_to(
            conn,
            ServerMessage::Events {
                events: events.clone(),
            },
        );

        for market in game.markets() {
            let symbol = market.symbol().to_string();
            hub.send_to(
                conn,
                ServerMessage::BookSnapshot {
                    symbol: symbol.clone(),
                    bids: market.depth(Side::Buy, DEPTH_LEVELS, conn),
                    asks: market.depth(Side::Sell, DEPTH_LEVELS, conn),
                },
            );
            let pos = market.position(conn);
            hub.send_to(
                conn,
                ServerMessage::Position {
                    symbol: symbol.clone(),
                    qty: pos.qty,
                    cash: pos.cash,
                    name: game.display_name(conn),
                },
            );
            let stats = market.stats_for(conn);
            hub.send_to(
                conn,
                ServerMessage::UserSummary {
                    symbol,
                    position: pos.qty,
                    avg_buy: stats.avg_buy(),
                    avg_sell: stats.avg_sell(),
                    buy_vol: stats.buy_vol,
                    sell_vol: stats.sell_vol,
                },
            );
        }

        hub.send_to(
            conn,
            ServerMessage::PnlImplied {
                pnl: game.pnl_implied(conn),
            },
        );
    }
}
