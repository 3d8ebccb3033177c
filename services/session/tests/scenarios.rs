//! End-to-end command scenarios
//!
//! Drives the dispatcher the way the transport does: one ConnId and one
//! outbound channel per client, commands in, pushed messages out.

use rust_decimal::Decimal;
use session::protocol::{ClientCommand, MarketDef, ServerMessage};
use session::{ConnectionHub, Dispatcher};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use types::ids::{ConnId, GameCode};
use types::order::Side;

const PASSWORD: &str = "secret";
const CODE: &str = "1234";

struct Client {
    conn: ConnId,
    joined: Option<GameCode>,
    rx: UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

struct Harness {
    dispatcher: Dispatcher,
}

impl Harness {
    fn new() -> Self {
        let hub = Arc::new(ConnectionHub::new());
        Self {
            dispatcher: Dispatcher::new(hub, PASSWORD),
        }
    }

    fn connect(&self) -> Client {
        let conn = ConnId::new();
        let rx = self.dispatcher.hub().register(conn);
        Client {
            conn,
            joined: None,
            rx,
        }
    }

    async fn send(&self, client: &mut Client, cmd: ClientCommand) {
        self.dispatcher
            .handle(client.conn, &mut client.joined, cmd)
            .await;
    }

    /// Admin creates the standard game, players join, all inboxes drained.
    async fn standard_game(&self, pos_limit: u64, players: &mut [&mut Client]) -> Client {
        let mut admin = self.connect();
        self.send(
            &mut admin,
            ClientCommand::AdminCreateGame {
                code: CODE.to_string(),
                admin_password: PASSWORD.to_string(),
                markets: vec![MarketDef {
                    symbol: "A".to_string(),
                    pos_limit: Some(pos_limit),
                    tick_size: None,
                }],
            },
        )
        .await;
        for player in players.iter_mut() {
            self.send(
                *player,
                ClientCommand::PlayerJoin {
                    code: CODE.to_string(),
                    name: String::new(),
                },
            )
            .await;
        }
        admin.drain();
        for player in players.iter_mut() {
            player.drain();
        }
        admin
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn place(side: Side, price: &str, qty: i64) -> ClientCommand {
    ClientCommand::PlaceOrder {
        symbol: "A".to_string(),
        side,
        price: dec(price),
        qty,
    }
}

fn trades(msgs: &[ServerMessage]) -> Vec<(Decimal, u64)> {
    msgs.iter()
        .filter_map(|m| match m {
            ServerMessage::Trade { price, qty, .. } => Some((price.as_decimal(), *qty)),
            _ => None,
        })
        .collect()
}

fn last_snapshot(msgs: &[ServerMessage]) -> Option<(Vec<(Decimal, u64, u64)>, Vec<(Decimal, u64, u64)>)> {
    msgs.iter()
        .filter_map(|m| match m {
            ServerMessage::BookSnapshot { bids, asks, .. } => {
                let view = |rows: &[matching_engine::book::LevelView]| {
                    rows.iter()
                        .map(|r| (r.price.as_decimal(), r.size, r.my))
                        .collect::<Vec<_>>()
                };
                Some((view(bids), view(asks)))
            }
            _ => None,
        })
        .last()
}

fn last_position(msgs: &[ServerMessage]) -> Option<(i64, Decimal)> {
    msgs.iter()
        .filter_map(|m| match m {
            ServerMessage::Position { qty, cash, .. } => Some((*qty, *cash)),
            _ => None,
        })
        .last()
}

#[tokio::test]
async fn create_game_checks_password_and_code() {
    let h = Harness::new();
    let mut admin = h.connect();

    h.send(
        &mut admin,
        ClientCommand::AdminCreateGame {
            code: CODE.to_string(),
            admin_password: "wrong".to_string(),
            markets: vec![],
        },
    )
    .await;
    let msgs = admin.drain();
    assert!(matches!(
        &msgs[0],
        ServerMessage::AdminAck { ok: false, error: Some(e), .. } if e == "Bad password"
    ));

    h.send(
        &mut admin,
        ClientCommand::AdminCreateGame {
            code: "12".to_string(),
            admin_password: PASSWORD.to_string(),
            markets: vec![],
        },
    )
    .await;
    let msgs = admin.drain();
    assert!(matches!(
        &msgs[0],
        ServerMessage::AdminAck { ok: false, error: Some(e), .. } if e == "Code must be 4 digits"
    ));
    assert!(admin.joined.is_none());

    h.send(
        &mut admin,
        ClientCommand::AdminCreateGame {
            code: CODE.to_string(),
            admin_password: PASSWORD.to_string(),
            markets: vec![MarketDef {
                symbol: "rates".to_string(),
                pos_limit: None,
                tick_size: None,
            }],
        },
    )
    .await;
    let msgs = admin.drain();
    match &msgs[0] {
        ServerMessage::AdminAck {
            ok: true,
            markets: Some(markets),
            ..
        } => {
            assert_eq!(markets.len(), 1);
            assert_eq!(markets[0].symbol, "RATES");
            assert!(markets[0].open);
            assert_eq!(markets[0].tick_size, dec("0.1"));
            assert_eq!(markets[0].pos_limit, 100);
        }
        other => panic!("unexpected ack: {:?}", other),
    }
    assert!(admin.joined.is_some());
}

#[tokio::test]
async fn join_unknown_game_is_nacked() {
    let h = Harness::new();
    let mut player = h.connect();
    h.send(
        &mut player,
        ClientCommand::PlayerJoin {
            code: "9999".to_string(),
            name: "bob".to_string(),
        },
    )
    .await;
    let msgs = player.drain();
    assert!(matches!(
        &msgs[0],
        ServerMessage::JoinAck { ok: false, error: Some(e), .. } if e == "Game not found"
    ));
    assert!(player.joined.is_none());
}

#[tokio::test]
async fn simple_cross_settles_both_ledgers() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    let mut admin = h.standard_game(100, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 5)).await;
    u1.drain();
    u2.drain();

    h.send(&mut u2, place(Side::Buy, "10.0", 5)).await;
    let u2_msgs = u2.drain();
    let u1_msgs = u1.drain();

    // The whole room sees the trade
    assert_eq!(trades(&u2_msgs), vec![(dec("10"), 5)]);
    assert_eq!(trades(&u1_msgs), vec![(dec("10"), 5)]);
    assert_eq!(trades(&admin.drain()), vec![(dec("10"), 5)]);

    let (bids, asks) = last_snapshot(&u2_msgs).unwrap();
    assert!(bids.is_empty());
    assert!(asks.is_empty());

    assert_eq!(last_position(&u2_msgs), Some((5, dec("-50"))));
    assert_eq!(last_position(&u1_msgs), Some((-5, dec("50"))));
}

#[tokio::test]
async fn partial_fill_rests_residual() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    h.standard_game(100, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 10)).await;
    u1.drain();
    u2.drain();

    h.send(&mut u2, place(Side::Buy, "10.0", 4)).await;
    let msgs = u2.drain();
    assert_eq!(trades(&msgs), vec![(dec("10"), 4)]);
    let (_, asks) = last_snapshot(&msgs).unwrap();
    assert_eq!(asks, vec![(dec("10"), 6, 0)]);
    assert_eq!(last_position(&msgs), Some((4, dec("-40"))));
}

#[tokio::test]
async fn fifo_within_level_fills_older_first() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    let mut u3 = h.connect();
    h.standard_game(100, &mut [&mut u1, &mut u2, &mut u3])
        .await;

    h.send(&mut u1, place(Side::Sell, "10.0", 3)).await;
    h.send(&mut u3, place(Side::Sell, "10.0", 4)).await;
    for c in [&mut u1, &mut u2, &mut u3] {
        c.drain();
    }

    h.send(&mut u2, place(Side::Buy, "10.0", 5)).await;
    let u2_msgs = u2.drain();
    assert_eq!(trades(&u2_msgs), vec![(dec("10"), 3), (dec("10"), 2)]);

    // U1 is flat and done, U3 keeps the tail of its order
    assert_eq!(last_position(&u1.drain()), Some((-3, dec("30"))));
    let u3_msgs = u3.drain();
    assert_eq!(last_position(&u3_msgs), Some((-2, dec("20"))));
    let (_, asks) = last_snapshot(&u3_msgs).unwrap();
    assert_eq!(asks, vec![(dec("10"), 2, 2)]);
}

#[tokio::test]
async fn sweep_fills_better_level_first() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    h.standard_game(100, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 2)).await;
    h.send(&mut u1, place(Side::Sell, "10.1", 3)).await;
    u1.drain();
    u2.drain();

    h.send(&mut u2, place(Side::Buy, "10.1", 4)).await;
    let msgs = u2.drain();
    assert_eq!(trades(&msgs), vec![(dec("10"), 2), (dec("10.1"), 2)]);
    let (_, asks) = last_snapshot(&msgs).unwrap();
    assert_eq!(asks, vec![(dec("10.1"), 1, 0)]);
}

#[tokio::test]
async fn pos_limit_reject_goes_to_caller_only() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    h.standard_game(5, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 3)).await;
    h.send(&mut u2, place(Side::Buy, "10.0", 3)).await;
    h.send(&mut u1, place(Side::Sell, "10.0", 2)).await;
    u1.drain();
    u2.drain();

    // Long 3 with limit 5: five more would overshoot
    h.send(&mut u2, place(Side::Buy, "10.0", 5)).await;
    let msgs = u2.drain();
    assert_eq!(msgs.len(), 1);
    assert!(matches!(
        &msgs[0],
        ServerMessage::OrderReject { symbol, reason }
            if symbol == "A" && *reason == types::errors::RejectReason::PosLimit
    ));
    // No fan-out, no trade: the rest of the room hears nothing
    assert!(u1.drain().is_empty());
}

#[tokio::test]
async fn click_trade_takes_one_level() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    h.standard_game(100, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 3)).await;
    h.send(&mut u1, place(Side::Sell, "10.1", 4)).await;
    u1.drain();
    u2.drain();

    h.send(
        &mut u2,
        ClientCommand::ClickTrade {
            symbol: "A".to_string(),
            side: Side::Buy,
            price: dec("10.0"),
            max_qty: 5.0,
        },
    )
    .await;
    let msgs = u2.drain();
    assert_eq!(trades(&msgs), vec![(dec("10"), 3)]);
    let (_, asks) = last_snapshot(&msgs).unwrap();
    assert_eq!(asks, vec![(dec("10.1"), 4, 0)]);
    assert_eq!(last_position(&msgs), Some((3, dec("-30"))));
}

#[tokio::test]
async fn placement_snaps_to_tick() {
    let h = Harness::new();
    let mut u1 = h.connect();
    h.standard_game(100, &mut [&mut u1]).await;

    h.send(&mut u1, place(Side::Buy, "10.04", 5)).await;
    let msgs = u1.drain();
    let (bids, _) = last_snapshot(&msgs).unwrap();
    assert_eq!(bids, vec![(dec("10"), 5, 5)]);
}

#[tokio::test]
async fn cancel_at_price_removes_all_and_is_idempotent() {
    let h = Harness::new();
    let mut u1 = h.connect();
    h.standard_game(100, &mut [&mut u1]).await;

    h.send(&mut u1, place(Side::Buy, "9.9", 5)).await;
    h.send(&mut u1, place(Side::Buy, "9.9", 3)).await;
    u1.drain();

    let cancel = ClientCommand::CancelAtPrice {
        symbol: "A".to_string(),
        side: Side::Buy,
        price: dec("9.9"),
    };
    h.send(&mut u1, cancel.clone()).await;
    let msgs = u1.drain();
    let (bids, _) = last_snapshot(&msgs).unwrap();
    assert!(bids.is_empty());
    // Cancellation does not touch the ledger
    assert_eq!(last_position(&msgs), Some((0, dec("0"))));

    h.send(&mut u1, cancel).await;
    let msgs = u1.drain();
    let (bids, _) = last_snapshot(&msgs).unwrap();
    assert!(bids.is_empty());
}

#[tokio::test]
async fn settled_market_blocks_placement_but_not_cancel() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut admin = h.standard_game(100, &mut [&mut u1]).await;

    h.send(&mut u1, place(Side::Buy, "9.9", 5)).await;
    u1.drain();

    h.send(
        &mut admin,
        ClientCommand::AdminSettle {
            symbol: "A".to_string(),
            price: dec("10.0"),
        },
    )
    .await;
    let msgs = u1.drain();
    let meta = msgs
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::MarketsMeta { markets } => Some(markets.clone()),
            _ => None,
        })
        .unwrap();
    assert!(!meta[0].open);
    assert_eq!(meta[0].settlement.unwrap().as_decimal(), dec("10"));

    // Placement on a settled market: silent drop, nothing pushed
    h.send(&mut u1, place(Side::Buy, "9.9", 5)).await;
    assert!(u1.drain().is_empty());

    // Cancellation still works
    h.send(
        &mut u1,
        ClientCommand::CancelAtPrice {
            symbol: "A".to_string(),
            side: Side::Buy,
            price: dec("9.9"),
        },
    )
    .await;
    let msgs = u1.drain();
    let (bids, _) = last_snapshot(&msgs).unwrap();
    assert!(bids.is_empty());
}

#[tokio::test]
async fn admin_commands_from_player_are_dropped() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut admin = h.standard_game(100, &mut [&mut u1]).await;

    h.send(
        &mut u1,
        ClientCommand::AdminSettle {
            symbol: "A".to_string(),
            price: dec("10.0"),
        },
    )
    .await;
    assert!(u1.drain().is_empty());
    assert!(admin.drain().is_empty());

    h.send(
        &mut u1,
        ClientCommand::AdminToggleAll { open: false },
    )
    .await;
    assert!(u1.drain().is_empty());
}

#[tokio::test]
async fn admin_event_is_broadcast_and_logged() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut admin = h.standard_game(100, &mut [&mut u1]).await;

    h.send(
        &mut admin,
        ClientCommand::AdminAddEvent {
            text: "pit opens in one minute".to_string(),
        },
    )
    .await;

    let msgs = u1.drain();
    assert!(msgs.iter().any(|m| matches!(
        m,
        ServerMessage::Event { text, .. } if text == "pit opens in one minute"
    )));
    let events = msgs
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::Events { events } => Some(events.clone()),
            _ => None,
        })
        .unwrap();
    assert!(events.iter().any(|e| e.text == "pit opens in one minute"));
}

#[tokio::test]
async fn malformed_orders_are_dropped() {
    let h = Harness::new();
    let mut u1 = h.connect();
    h.standard_game(100, &mut [&mut u1]).await;

    h.send(&mut u1, place(Side::Buy, "-1", 5)).await;
    h.send(&mut u1, place(Side::Buy, "10.0", 0)).await;
    h.send(&mut u1, place(Side::Buy, "10.0", -3)).await;
    h.send(
        &mut u1,
        ClientCommand::PlaceOrder {
            symbol: "NOPE".to_string(),
            side: Side::Buy,
            price: dec("10.0"),
            qty: 5,
        },
    )
    .await;
    assert!(u1.drain().is_empty());
}

#[tokio::test]
async fn commands_before_join_are_dropped() {
    let h = Harness::new();
    let mut stranger = h.connect();
    h.send(&mut stranger, place(Side::Buy, "10.0", 5)).await;
    assert!(stranger.drain().is_empty());
}

#[tokio::test]
async fn settle_all_closes_every_market() {
    let h = Harness::new();
    let mut admin = h.connect();
    h.send(
        &mut admin,
        ClientCommand::AdminCreateGame {
            code: CODE.to_string(),
            admin_password: PASSWORD.to_string(),
            markets: vec![
                MarketDef {
                    symbol: "A".to_string(),
                    pos_limit: None,
                    tick_size: None,
                },
                MarketDef {
                    symbol: "B".to_string(),
                    pos_limit: None,
                    tick_size: None,
                },
            ],
        },
    )
    .await;
    admin.drain();

    let mut prices = HashMap::new();
    prices.insert("A".to_string(), dec("10.0"));
    prices.insert("B".to_string(), dec("20.0"));
    h.send(&mut admin, ClientCommand::AdminSettleAll { price_map: prices })
        .await;

    let msgs = admin.drain();
    let meta = msgs
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::MarketsMeta { markets } => Some(markets.clone()),
            _ => None,
        })
        .unwrap();
    assert!(meta.iter().all(|m| !m.open && m.settlement.is_some()));
}

#[tokio::test]
async fn disconnect_keeps_orders_resting() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    h.standard_game(100, &mut [&mut u1, &mut u2]).await;

    h.send(&mut u1, place(Side::Sell, "10.0", 5)).await;
    u1.drain();
    u2.drain();

    let joined = u1.joined.take();
    h.dispatcher.disconnect(u1.conn, joined).await;

    let msgs = u2.drain();
    let (_, asks) = last_snapshot(&msgs).unwrap();
    assert_eq!(asks, vec![(dec("10"), 5, 0)]);

    // The departed user's resting order still trades
    h.send(&mut u2, place(Side::Buy, "10.0", 5)).await;
    let msgs = u2.drain();
    assert_eq!(trades(&msgs), vec![(dec("10"), 5)]);
}

#[tokio::test]
async fn books_and_ledgers_hold_invariants_after_traffic() {
    let h = Harness::new();
    let mut u1 = h.connect();
    let mut u2 = h.connect();
    let mut u3 = h.connect();
    h.standard_game(50, &mut [&mut u1, &mut u2, &mut u3])
        .await;

    h.send(&mut u1, place(Side::Sell, "10.04", 7)).await;
    h.send(&mut u2, place(Side::Buy, "9.9", 4)).await;
    h.send(&mut u3, place(Side::Buy, "10.0", 5)).await;
    h.send(&mut u1, place(Side::Sell, "9.87", 6)).await;
    h.send(
        &mut u2,
        ClientCommand::ClickTrade {
            symbol: "A".to_string(),
            side: Side::Buy,
            price: dec("10.0"),
            max_qty: 2.9,
        },
    )
    .await;
    h.send(
        &mut u3,
        ClientCommand::CancelAtPrice {
            symbol: "A".to_string(),
            side: Side::Buy,
            price: dec("10.0"),
        },
    )
    .await;

    let code = GameCode::parse(CODE).unwrap();
    let shared = h.dispatcher.registry().get(&code).unwrap();
    let game = shared.lock().await;
    let market = game.market("A").unwrap();

    let qty_sum: i64 = market.ledger().iter().map(|(_, p)| p.qty).sum();
    let cash_sum: Decimal = market.ledger().iter().map(|(_, p)| p.cash).sum();
    assert_eq!(qty_sum, 0);
    assert_eq!(cash_sum, Decimal::ZERO);

    let tick = market.tick();
    for side in [Side::Buy, Side::Sell] {
        for row in market.depth(side, 200, u1.conn) {
            // Every surviving level is a tick multiple and non-empty
            assert_eq!(row.price.as_decimal() % tick, Decimal::ZERO);
            assert!(row.size > 0);
        }
        for order in market.book().orders(side) {
            assert!(order.leaves > 0 && order.leaves <= order.qty);
        }
    }
}
