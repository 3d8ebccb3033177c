//! Executed trade record

use crate::ids::ConnId;
use crate::numeric::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One execution between a resting maker and an aggressor.
///
/// The price is always the resting maker's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution timestamp, milliseconds since epoch
    pub ts: i64,
    pub symbol: String,
    pub price: Price,
    pub qty: u64,
    pub buyer: ConnId,
    pub seller: ConnId,
}

impl Trade {
    /// Trade value (price × qty)
    pub fn notional(&self) -> Decimal {
        self.price.notional(self.qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_notional() {
        let trade = Trade {
            ts: 0,
            symbol: "A".to_string(),
            price: Price::snap("10".parse().unwrap(), Decimal::new(1, 1)),
            qty: 5,
            buyer: ConnId::new(),
            seller: ConnId::new(),
        };
        assert_eq!(trade.notional(), Decimal::from(50));
    }
}
