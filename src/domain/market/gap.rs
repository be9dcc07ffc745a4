//! GapRecord — a detected break in the exchange-assigned trade-id sequence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapRecord {
    pub id: Option<i64>,
    pub exchange: String,
    pub symbol: String,
    pub from_trade_id: u64,
    pub to_trade_id: u64,
    pub detected_at: i64,
    pub synced: bool,
    pub synced_at: Option<i64>,
}

impl GapRecord {
    pub fn new(exchange: &str, symbol: &str, from_trade_id: u64, to_trade_id: u64, detected_at: i64) -> Self {
        Self {
            id: None,
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            from_trade_id,
            to_trade_id,
            detected_at,
            synced: false,
            synced_at: None,
        }
    }

    pub fn gap_size(&self) -> u64 {
        self.to_trade_id - self.from_trade_id + 1
    }

    pub fn is_valid(&self) -> bool {
        self.to_trade_id >= self.from_trade_id && self.gap_size() > 0 && self.detected_at > 0
    }
}

/// Optional filters accepted by `gap_load` (spec.md §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapFilter {
    pub exchange: Option<String>,
    pub symbol: Option<String>,
    pub synced_only: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_size_is_inclusive() {
        let gap = GapRecord::new("binance", "BTCUSDT", 101, 104, 1);
        assert_eq!(gap.gap_size(), 4);
        assert!(gap.is_valid());
    }
}
