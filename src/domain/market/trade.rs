//! Trade — one execution received from a trade source.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn is_buy(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Market,
    Other,
}

/// One trade as received from an exchange trade stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub trade_id: u64,
    pub price: f64,
    pub quantity: f64,
    pub side: TradeSide,
    pub trade_type: Option<TradeType>,
}

impl Trade {
    /// spec.md §4.3 step 5: eligible to update the footprint iff trade_type is
    /// absent or MARKET, and price/quantity are strictly positive.
    pub fn is_footprint_eligible(&self) -> bool {
        matches!(self.trade_type, None | Some(TradeType::Market)) && self.price > 0.0 && self.quantity > 0.0
    }
}
