//! CandleGroup — the full set of footprint candles for one symbol, across every
//! supported timeframe, plus its bin-size configuration.

use super::footprint_candle::FootprintCandle;
use super::symbol_config::{PendingConfig, SymbolConfig};
use super::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleGroup {
    pub exchange: String,
    pub symbol: String,
    pub tick_value: f64,
    pub bin_multiplier: u32,
    pub candles: HashMap<Timeframe, FootprintCandle>,
    #[serde(default)]
    pub pending_config: Option<PendingConfig>,
}

impl CandleGroup {
    pub fn effective_bin_size(&self) -> f64 {
        self.tick_value * self.bin_multiplier as f64
    }

    /// One empty candle per supported timeframe, anchored at `timestamp_ms`
    /// (spec.md §4.3 step 1).
    pub fn new_default(exchange: &str, symbol: &str, config: &SymbolConfig, timestamp_ms: i64) -> Self {
        let effective_bin_size = config.effective_bin_size();
        let candles = Timeframe::all()
            .iter()
            .map(|&tf| {
                (
                    tf,
                    FootprintCandle::new_empty(exchange, symbol, tf, timestamp_ms, effective_bin_size),
                )
            })
            .collect();
        Self {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            tick_value: config.tick_value,
            bin_multiplier: config.bin_multiplier,
            candles,
            pending_config: None,
        }
    }

    pub fn one_sec(&mut self) -> &mut FootprintCandle {
        self.candles.get_mut(&Timeframe::OneSec).expect("every timeframe present by construction")
    }

    /// Stage a `{tickValue, binMultiplier}` change for the symbol (spec.md §4.3
    /// step 2). No-op if a change is already staged or the values are unchanged.
    pub fn stage_pending_config(&mut self, tick_value: f64, bin_multiplier: u32, now: i64) {
        if self.pending_config.is_some() {
            return;
        }
        if tick_value != self.tick_value || bin_multiplier != self.bin_multiplier {
            self.pending_config = Some(PendingConfig { tick_value, bin_multiplier, updated_at: now });
        }
    }

    /// If the 1d candle is among `completions` and a config change is staged,
    /// recreate the whole group under the new bin size (spec.md §4.4). Returns
    /// `true` if the group was replaced.
    pub fn apply_pending_config_if_due(&mut self, completions: &[(Timeframe, FootprintCandle)], timestamp_ms: i64) -> bool {
        if !completions.iter().any(|(tf, _)| *tf == Timeframe::OneDay) {
            return false;
        }
        let Some(pending) = self.pending_config.take() else {
            return false;
        };
        let config = SymbolConfig {
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
            tick_value: pending.tick_value,
            bin_multiplier: pending.bin_multiplier,
            precision: None,
            min_price: None,
            max_price: None,
        };
        *self = Self::new_default(&self.exchange, &self.symbol, &config, timestamp_ms);
        true
    }

    /// Fold a completed 1s candle into every open higher timeframe (spec.md
    /// §4.4, scenario 4: "its stats fold into the open 1m, 3m, …, 1d candles").
    /// Each target timeframe receives the same 1s snapshot directly — there is
    /// no cascade through intermediate completions, so a 1m completion this
    /// tick doesn't gate whether 3m also gets folded. Returns the completed
    /// snapshots of any timeframe that closed as a result, in ascending
    /// timeframe order (so 1d, if present, is last — needed by the
    /// pending-config protocol).
    pub fn rollup(&mut self, completed_one_sec: &FootprintCandle, trade_timestamp_ms: i64) -> Vec<(Timeframe, FootprintCandle)> {
        let mut completions = Vec::new();

        for &tf in Timeframe::rollup_targets() {
            let candle = self
                .candles
                .get_mut(&tf)
                .expect("every timeframe present by construction");
            candle.fold(completed_one_sec);

            let boundary_crossed = tf.period_index(trade_timestamp_ms) > tf.period_index(candle.t);
            if !boundary_crossed {
                continue;
            }

            let snapshot = candle.complete(tf);
            let fresh = FootprintCandle::new_empty(
                &self.exchange,
                &self.symbol,
                tf,
                trade_timestamp_ms,
                self.effective_bin_size(),
            );
            *candle = fresh;
            completions.push((tf, snapshot));
        }

        completions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SymbolConfig {
        SymbolConfig {
            exchange: "binance".to_string(),
            symbol: "BTCUSDT".to_string(),
            tick_value: 0.01,
            bin_multiplier: 1,
            precision: None,
            min_price: None,
            max_price: None,
        }
    }

    #[test]
    fn new_default_has_one_candle_per_timeframe() {
        let group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        assert_eq!(group.candles.len(), Timeframe::all().len());
    }

    #[test]
    fn rollup_without_boundary_cross_updates_every_open_timeframe() {
        let mut group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        let mut one_sec = group.one_sec().clone();
        one_sec.apply_trade(50000.0, 1.0, true, 1);
        let completed = one_sec.complete(Timeframe::OneSec);

        let completions = group.rollup(&completed, 1_700_000_000_000);
        assert!(completions.is_empty());
        for &tf in Timeframe::rollup_targets() {
            assert_eq!(group.candles[&tf].v, 1.0, "{tf} should have received the 1s fold directly");
        }
    }
}
