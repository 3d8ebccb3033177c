//! Command dispatcher
//!
//! Validates every inbound command, routes it into the addressed session
//! under that session's mutex, and triggers fan-out afterwards. Auth and
//! shape failures on create/join are nacked; role violations, closed or
//! missing markets, and malformed arguments are dropped silently; a
//! position-limit breach on placement is the one business reject sent back.

use crate::fanout;
use crate::game::Game;
use crate::hub::ConnectionHub;
use crate::protocol::{ClientCommand, MarketDef, ServerMessage};
use crate::registry::SessionRegistry;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use types::errors::CommandError;
use types::ids::{ConnId, GameCode};
use types::order::Side;
use types::trade::Trade;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub struct Dispatcher {
    registry: SessionRegistry,
    hub: Arc<ConnectionHub>,
    admin_password: String,
}

impl Dispatcher {
    pub fn new(hub: Arc<ConnectionHub>, admin_password: impl Into<String>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            hub,
            admin_password: admin_password.into(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Process one command from `conn`. `joined` is the connection's
    /// session affiliation, set by a successful create or join.
    pub async fn handle(&self, conn: ConnId, joined: &mut Option<GameCode>, cmd: ClientCommand) {
        match cmd {
            ClientCommand::AdminCreateGame {
                code,
                admin_password,
                markets,
            } => {
                self.admin_create_game(conn, joined, code, admin_password, markets)
                    .await
            }
            ClientCommand::PlayerJoin { code, name } => {
                self.player_join(conn, joined, code, name).await
            }
            other => {
                let Some(code) = joined.clone() else {
                    debug!(%conn, "command before join, dropped");
                    return;
                };
                let Some(shared) = self.registry.get(&code) else {
                    return;
                };
                let mut game = shared.lock().await;
                let changed = self.in_session(conn, &mut game, other);
                if changed {
                    fanout::fan_out(&game, &self.hub);
                }
            }
        }
    }

    /// Tear down a connection: unregister its outbound channel and drop its
    /// session membership. Resting orders and positions stay behind.
    pub async fn disconnect(&self, conn: ConnId, joined: Option<GameCode>) {
        self.hub.unregister(conn);
        let Some(code) = joined else {
            return;
        };
        let Some(shared) = self.registry.get(&code) else {
            return;
        };
        let mut game = shared.lock().await;
        let name = game.display_name(conn);
        game.remove_conn(conn);
        game.push_event(now_ms(), &format!("{} left", name));
        info!(%conn, code = %code, "connection left game");
        fanout::fan_out(&game, &self.hub);
    }

    async fn admin_create_game(
        &self,
        conn: ConnId,
        joined: &mut Option<GameCode>,
        code_raw: String,
        password: String,
        markets: Vec<MarketDef>,
    ) {
        if password != self.admin_password {
            self.hub.send_to(
                conn,
                ServerMessage::AdminAck {
                    ok: false,
                    error: Some(CommandError::BadPassword.to_string()),
                    code: code_raw,
                    markets: None,
                },
            );
            return;
        }
        let Some(code) = GameCode::parse(&code_raw) else {
            self.hub.send_to(
                conn,
                ServerMessage::AdminAck {
                    ok: false,
                    error: Some(CommandError::BadCode.to_string()),
                    code: code_raw,
                    markets: None,
                },
            );
            return;
        };

        let shared = self.registry.get_or_create(code.clone(), &markets);
        let mut game = shared.lock().await;
        game.make_admin(conn);
        *joined = Some(code.clone());
        info!(%conn, code = %code, "admin created or rejoined game");

        self.hub.send_to(
            conn,
            ServerMessage::AdminAck {
                ok: true,
                error: None,
                code: code.as_str().to_string(),
                markets: Some(game.market_meta()),
            },
        );
        fanout::fan_out(&game, &self.hub);
    }

    async fn player_join(
        &self,
        conn: ConnId,
        joined: &mut Option<GameCode>,
        code_raw: String,
        name_raw: String,
    ) {
        let found = GameCode::parse(&code_raw).and_then(|c| self.registry.get(&c).map(|g| (c, g)));
        let Some((code, shared)) = found else {
            self.hub.send_to(
                conn,
                ServerMessage::JoinAck {
                    ok: false,
                    error: Some(CommandError::GameNotFound.to_string()),
                    code: code_raw,
                    name: name_raw,
                    markets: None,
                },
            );
            return;
        };

        let mut game = shared.lock().await;
        let name = game.join_player(conn, &name_raw);
        game.push_event(now_ms(), &format!("{} joined", name));
        *joined = Some(code.clone());
        info!(%conn, code = %code, name = %name, "player joined game");

        self.hub.send_to(
            conn,
            ServerMessage::JoinAck {
                ok: true,
                error: None,
                code: code.as_str().to_string(),
                name,
                markets: Some(game.market_meta()),
            },
        );
        fanout::fan_out(&game, &self.hub);
    }

    /// In-session commands, executed under the session mutex. Returns
    /// whether state changed and fan-out should run.
    fn in_session(&self, conn: ConnId, game: &mut Game, cmd: ClientCommand) -> bool {
        match cmd {
            ClientCommand::PlaceOrder {
                symbol,
                side,
                price,
                qty,
            } => self.place_order(conn, game, symbol, side, price, qty),
            ClientCommand::CancelAtPrice {
                symbol,
                side,
                price,
            } => {
                let Some(market) = game.market_mut(&symbol) else {
                    debug!(%conn, %symbol, "cancel for unknown market, dropped");
                    return false;
                };
                let removed = market.cancel_at_price(conn, side, price);
                debug!(%conn, %symbol, removed, "cancel at price");
                true
            }
            ClientCommand::ClickTrade {
                symbol,
                side,
                price,
                max_qty,
            } => self.click_trade(conn, game, symbol, side, price, max_qty),
            ClientCommand::AdminToggleMarket { symbol, open } => {
                if !game.is_admin(conn) {
                    debug!(%conn, "admin command from non-admin, dropped");
                    return false;
                }
                let Some(market) = game.market_mut(&symbol) else {
                    return false;
                };
                market.set_open(open);
                self.broadcast_meta(game);
                true
            }
            ClientCommand::AdminToggleAll { open } => {
                if !game.is_admin(conn) {
                    debug!(%conn, "admin command from non-admin, dropped");
                    return false;
                }
                for market in game.markets_mut() {
                    market.set_open(open);
                }
                self.broadcast_meta(game);
                true
            }
            ClientCommand::AdminSettle { symbol, price } => {
                if !game.is_admin(conn) {
                    debug!(%conn, "admin command from non-admin, dropped");
                    return false;
                }
                self.settle_markets(game, [(symbol, price)].into_iter().collect());
                true
            }
            ClientCommand::AdminSettleAll { price_map } => {
                if !game.is_admin(conn) {
                    debug!(%conn, "admin command from non-admin, dropped");
                    return false;
                }
                self.settle_markets(game, price_map);
                true
            }
            ClientCommand::AdminAddEvent { text } => {
                if !game.is_admin(conn) {
                    debug!(%conn, "admin command from non-admin, dropped");
                    return false;
                }
                let event = game.push_event(now_ms(), &text);
                self.hub.broadcast(
                    &game.viewers(),
                    &ServerMessage::Event {
                        ts: event.ts,
                        text: event.text,
                    },
                );
                true
            }
            // Create and join are matched before we get here
            ClientCommand::AdminCreateGame { .. } | ClientCommand::PlayerJoin { .. } => false,
        }
    }

    fn place_order(
        &self,
        conn: ConnId,
        game: &mut Game,
        symbol: String,
        side: Side,
        price: Decimal,
        qty: i64,
    ) -> bool {
        let open = game.market(&symbol).map(|m| m.is_open());
        if open != Some(true) {
            debug!(%conn, %symbol, "order for closed or unknown market, dropped");
            return false;
        }
        if price <= Decimal::ZERO || qty <= 0 {
            debug!(%conn, %symbol, "order with non-positive price or qty, dropped");
            return false;
        }

        match game
            .place_order(conn, &symbol, side, price, qty as u64, now_ms())
            .expect("market presence checked above")
        {
            Ok(placed) => {
                debug!(%conn, %symbol, order_id = %placed.order_id,
                    fills = placed.trades.len(), "order accepted");
                self.broadcast_trades(game, &placed.trades);
                true
            }
            Err(reason) => {
                self.hub
                    .send_to(conn, ServerMessage::OrderReject { symbol, reason });
                false
            }
        }
    }

    fn click_trade(
        &self,
        conn: ConnId,
        game: &mut Game,
        symbol: String,
        side: Side,
        price: Decimal,
        max_qty: f64,
    ) -> bool {
        let open = game.market(&symbol).map(|m| m.is_open());
        if open != Some(true) {
            debug!(%conn, %symbol, "click for closed or unknown market, dropped");
            return false;
        }
        let max_qty = if max_qty.floor() >= 1.0 {
            max_qty.floor() as u64
        } else {
            1
        };

        let market = game.market_mut(&symbol).expect("presence checked above");
        let taken = market.take_at_price(conn, side, price, max_qty, now_ms());
        debug!(%conn, %symbol, filled = taken.filled, "click trade");
        self.broadcast_trades(game, &taken.trades);
        true
    }

    fn broadcast_trades(&self, game: &Game, trades: &[Trade]) {
        let viewers = game.viewers();
        for trade in trades {
            self.hub.broadcast(
                &viewers,
                &ServerMessage::Trade {
                    ts: trade.ts,
                    symbol: trade.symbol.clone(),
                    price: trade.price,
                    qty: trade.qty,
                },
            );
        }
    }

    fn broadcast_meta(&self, game: &Game) {
        self.hub.broadcast(
            &game.viewers(),
            &ServerMessage::MarketsMeta {
                markets: game.market_meta(),
            },
        );
    }

    fn settle_markets(&self, game: &mut Game, price_map: HashMap<String, Decimal>) {
        let ts = now_ms();
        for (symbol, raw) in price_map {
            let Some(market) = game.market_mut(&symbol) else {
                continue;
            };
            let px = market.settle(raw);
            info!(%symbol, price = %px, "market settled");
            game.push_event(ts, &format!("{} settled @ {}", symbol, px));
        }
        self.broadcast_meta(game);
    }
}
