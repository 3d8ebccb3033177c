//! Wire protocol
//!
//! Inbound commands and outbound messages, tagged by a `type` field with
//! snake_case tags and camelCase payload fields. A frame that fails to
//! deserialize is dropped by the transport; the dispatcher never sees it.

use matching_engine::book::LevelView;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::errors::RejectReason;
use types::numeric::Price;
use types::order::Side;

/// One market requested at game creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDef {
    #[serde(default)]
    pub symbol: String,
    pub pos_limit: Option<u64>,
    pub tick_size: Option<Decimal>,
}

/// Commands a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    AdminCreateGame {
        code: String,
        admin_password: String,
        #[serde(default)]
        markets: Vec<MarketDef>,
    },
    PlayerJoin {
        code: String,
        #[serde(default)]
        name: String,
    },
    AdminToggleMarket {
        symbol: String,
        open: bool,
    },
    AdminToggleAll {
        open: bool,
    },
    AdminSettle {
        symbol: String,
        price: Decimal,
    },
    AdminSettleAll {
        price_map: HashMap<String, Decimal>,
    },
    AdminAddEvent {
        text: String,
    },
    PlaceOrder {
        symbol: String,
        side: Side,
        price: Decimal,
        qty: i64,
    },
    CancelAtPrice {
        symbol: String,
        side: Side,
        price: Decimal,
    },
    ClickTrade {
        symbol: String,
        side: Side,
        price: Decimal,
        max_qty: f64,
    },
}

/// Per-market summary pushed with every bundle and on admin meta changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMeta {
    pub symbol: String,
    pub open: bool,
    pub settlement: Option<Price>,
    pub pos_limit: u64,
    pub click_size: u64,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub tick_size: Decimal,
}

/// One entry of the session event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub ts: i64,
    pub text: String,
}

/// Messages pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    AdminAck {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        markets: Option<Vec<MarketMeta>>,
    },
    JoinAck {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        code: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        markets: Option<Vec<MarketMeta>>,
    },
    OrderReject {
        symbol: String,
        reason: RejectReason,
    },
    MarketsMeta {
        markets: Vec<MarketMeta>,
    },
    Trade {
        ts: i64,
        symbol: String,
        price: Price,
        qty: u64,
    },
    Event {
        ts: i64,
        text: String,
    },
    BookSnapshot {
        symbol: String,
        bids: Vec<LevelView>,
        asks: Vec<LevelView>,
    },
    Position {
        symbol: String,
        qty: i64,
        cash: Decimal,
        name: String,
    },
    UserSummary {
        symbol: String,
        position: i64,
        avg_buy: Decimal,
        avg_sell: Decimal,
        buy_vol: u64,
        sell_vol: u64,
    },
    PnlImplied {
        pnl: Decimal,
    },
    Events {
        events: Vec<SessionEvent>,
    },
}
