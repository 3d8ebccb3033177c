//! Session layer for the trading-pit simulator
//!
//! Groups markets under four-digit join codes, tags connections with a role,
//! gates writes by role, and pushes every viewer a personalized view after
//! each state change.
//!
//! # Architecture
//!
//! ```text
//! inbound command
//!       │
//!   ┌───▼────┐      ┌──────────────┐
//!   │dispatch│─────▶│ Game (serial │
//!   └───┬────┘      │  per session)│
//!       │           └──────┬───────┘
//!    acks/rejects          │ trades, meta
//!       │           ┌──────▼───────┐
//!       └──────────▶│   fan-out    │──▶ every viewer in the room
//!                   └──────────────┘
//! ```
//!
//! Commands for one session execute under that session's mutex, so fan-out
//! always reflects a consistent snapshot. Sessions are independent.

pub mod dispatch;
pub mod fanout;
pub mod game;
pub mod hub;
pub mod protocol;
pub mod registry;

pub use dispatch::Dispatcher;
pub use hub::ConnectionHub;
pub use registry::SessionRegistry;
