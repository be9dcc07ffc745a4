//! SymbolConfig / PendingConfig — per-symbol bin sizing, mutable via operator action.

use super::bin_size::calculate_bin_size;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub exchange: String,
    pub symbol: String,
    pub tick_value: f64,
    pub bin_multiplier: u32,
    pub precision: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SymbolConfig {
    pub fn effective_bin_size(&self) -> f64 {
        self.tick_value * self.bin_multiplier as f64
    }

    /// Derives `bin_multiplier` from `reference_price` via the §4.5 bin-size
    /// calculator instead of requiring an operator to pick one by hand — the
    /// path a symbol-sync workflow takes when it onboards a symbol it has never
    /// seen a pinned bin size for.
    pub fn with_calculated_bin_size(exchange: &str, symbol: &str, tick_value: f64, reference_price: f64) -> Self {
        let result = calculate_bin_size(reference_price, tick_value);
        Self {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            tick_value,
            bin_multiplier: result.bin_multiplier,
            precision: None,
            min_price: None,
            max_price: None,
        }
    }
}

/// A staged `{tickValue, binMultiplier}` change, applied only at the next 1d
/// completion (spec.md §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PendingConfig {
    pub tick_value: f64,
    pub bin_multiplier: u32,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_calculated_bin_size_derives_a_positive_multiplier() {
        let config = SymbolConfig::with_calculated_bin_size("binance", "BTCUSDT", 0.01, 60_000.0);
        assert_eq!(config.tick_value, 0.01);
        assert!(config.bin_multiplier >= 1);
        assert!(config.effective_bin_size() > 0.0);
    }
}
