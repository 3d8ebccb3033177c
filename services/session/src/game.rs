//! Session state
//!
//! One `Game` owns its markets, the connection roles and display names, and
//! the event log. All of it is mutated under the session mutex held by the
//! dispatcher, so methods here are plain synchronous code.

use crate::protocol::{MarketDef, MarketMeta, SessionEvent};
use matching_engine::market::Market;
use matching_engine::matching::Placed;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use types::errors::RejectReason;
use types::ids::{ConnId, GameCode, OrderSeq};
use types::order::Side;

/// Markets per session cap.
pub const MAX_MARKETS: usize = 5;
/// Event log ring capacity.
pub const EVENT_CAP: usize = 500;
/// Events included in each bundle.
pub const EVENTS_SENT: usize = 200;
/// Event text length cap, in characters.
pub const EVENT_TEXT_MAX: usize = 500;

const SYMBOL_MAX: usize = 16;
const NAME_MAX: usize = 24;

/// Connection role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Player,
}

/// One session: markets, membership, event log, order id source.
#[derive(Debug)]
pub struct Game {
    code: GameCode,
    markets: BTreeMap<String, Market>,
    usernames: HashMap<ConnId, String>,
    roles: HashMap<ConnId, Role>,
    events: VecDeque<SessionEvent>,
    seq: OrderSeq,
}

impl Game {
    /// Build a session from the first `MAX_MARKETS` definitions, with
    /// sanitized symbols and per-market defaults filled in.
    pub fn new(code: GameCode, defs: &[MarketDef]) -> Self {
        let mut markets = BTreeMap::new();
        for def in defs.iter().take(MAX_MARKETS) {
            let symbol = sanitize_symbol(&def.symbol);
            let tick = def.tick_size.unwrap_or(Market::DEFAULT_TICK);
            let pos_limit = def.pos_limit.unwrap_or(Market::DEFAULT_POS_LIMIT);
            markets
                .entry(symbol.clone())
                .or_insert_with(|| Market::new(symbol, tick, pos_limit));
        }
        Self {
            code,
            markets,
            usernames: HashMap::new(),
            roles: HashMap::new(),
            events: VecDeque::new(),
            seq: OrderSeq::new(),
        }
    }

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    /// Tag a connection as the session admin.
    pub fn make_admin(&mut self, conn: ConnId) {
        self.roles.insert(conn, Role::Admin);
        self.usernames
            .entry(conn)
            .or_insert_with(|| "Admin".to_string());
    }

    /// Tag a connection as a player with a sanitized display name.
    /// Returns the name actually stored.
    pub fn join_player(&mut self, conn: ConnId, raw_name: &str) -> String {
        let name = sanitize_name(raw_name, conn);
        self.roles.insert(conn, Role::Player);
        self.usernames.insert(conn, name.clone());
        name
    }

    pub fn is_admin(&self, conn: ConnId) -> bool {
        self.roles.get(&conn) == Some(&Role::Admin)
    }

    pub fn is_member(&self, conn: ConnId) -> bool {
        self.roles.contains_key(&conn)
    }

    /// Drop a connection's membership. Resting orders and positions keyed
    /// by the connection id stay behind.
    pub fn remove_conn(&mut self, conn: ConnId) {
        self.usernames.remove(&conn);
        self.roles.remove(&conn);
    }

    pub fn display_name(&self, conn: ConnId) -> String {
        self.usernames
            .get(&conn)
            .cloned()
            .unwrap_or_else(|| format!("Player-{}", conn.short()))
    }

    /// Everyone currently in the room.
    pub fn viewers(&self) -> Vec<ConnId> {
        self.roles.keys().copied().collect()
    }

    pub fn market(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn market_mut(&mut self, symbol: &str) -> Option<&mut Market> {
        self.markets.get_mut(symbol)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn markets_mut(&mut self) -> impl Iterator<Item = &mut Market> {
        self.markets.values_mut()
    }

    /// Place a limit order in one of this session's markets, drawing the id
    /// from the session-local sequence.
    pub fn place_order(
        &mut self,
        user: ConnId,
        symbol: &str,
        side: Side,
        price: Decimal,
        qty: u64,
        ts: i64,
    ) -> Option<Result<Placed, RejectReason>> {
        let market = self.markets.get_mut(symbol)?;
        Some(market.place_limit(&mut self.seq, user, side, price, qty, ts))
    }

    /// Append to the event log ring, truncating long text.
    pub fn push_event(&mut self, ts: i64, text: &str) -> SessionEvent {
        let text: String = text.chars().take(EVENT_TEXT_MAX).collect();
        let event = SessionEvent { ts, text };
        if self.events.len() >= EVENT_CAP {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        event
    }

    /// The most recent events, oldest first.
    pub fn recent_events(&self) -> Vec<SessionEvent> {
        let skip = self.events.len().saturating_sub(EVENTS_SENT);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Per-market summaries for meta pushes.
    pub fn market_meta(&self) -> Vec<MarketMeta> {
        self.markets
            .values()
            .map(|m| MarketMeta {
                symbol: m.symbol().to_string(),
                open: m.is_open(),
                settlement: m.settlement(),
                pos_limit: m.pos_limit(),
                click_size: m.click_size(),
                best_bid: m.book().best_bid(),
                best_ask: m.book().best_ask(),
                tick_size: m.tick(),
            })
            .collect()
    }

    /// Mark-to-market PnL across all markets for one viewer: cash plus
    /// position at the implied price (settlement, else mid, else zero).
    pub fn pnl_implied(&self, viewer: ConnId) -> Decimal {
        self.markets
            .values()
            .map(|m| {
                let pos = m.position(viewer);
                pos.cash + Decimal::from(pos.qty) * m.mark()
            })
            .sum()
    }
}

fn sanitize_symbol(raw: &str) -> String {
    let symbol: String = raw.trim().to_uppercase().chars().take(SYMBOL_MAX).collect();
    if symbol.is_empty() {
        "A".to_string()
    } else {
        symbol
    }
}

fn sanitize_name(raw: &str, conn: ConnId) -> String {
    let name: String = raw.trim().chars().take(NAME_MAX).collect();
    if name.is_empty() {
        format!("Player-{}", conn.short())
    } else {
        name
    }
}
