//! Tick-snapped price type
//!
//! Uses rust_decimal for exact arithmetic. Every price entering a book is
//! snapped to the market tick first, so price keys compare and hash cleanly
//! in the level maps. Serialized as string to prevent JSON number precision
//! loss.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price with fixed-point decimal representation.
///
/// Always an exact integer multiple of the tick it was snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Snap a raw price to the nearest tick multiple.
    ///
    /// Ticks at or below zero are clamped to 1e-6 so a degenerate market
    /// definition cannot divide by zero. Midpoints round away from zero.
    pub fn snap(raw: Decimal, tick: Decimal) -> Self {
        let tick = tick.max(Decimal::new(1, 6));
        let steps = (raw / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self((steps * tick).normalize())
    }

    /// Wrap an already-snapped decimal value.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value.normalize())
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Trade value of `qty` units at this price
    pub fn notional(&self, qty: u64) -> Decimal {
        self.0 * Decimal::from(qty)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

// Custom serialization to preserve precision
impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let decimal = Decimal::from_str(&s).map_err(serde::de::Error::custom)?;
        Ok(Self(decimal.normalize()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
