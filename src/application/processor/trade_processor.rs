//! `process_trade` — advances one `CandleGroup` by exactly one `Trade` (spec.md
//! §4.3). Grounded on the teacher's `CandlePipeline::process` staged-pipeline
//! shape (`application/agents/candle_pipeline.rs`): discrete, testable steps
//! rather than one monolithic function.

use crate::application::processor::rollup;
use crate::domain::market::candle_group::CandleGroup;
use crate::domain::market::footprint_candle::FootprintCandle;
use crate::domain::market::gap::GapRecord;
use crate::domain::market::symbol_config::SymbolConfig;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Duplicate,
    OutOfOrder,
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Every candle that closed as a result of this trade, ascending timeframe
    /// order (1s first, 1d last if present).
    pub completed: Vec<(Timeframe, FootprintCandle)>,
    pub gap_detected: Option<GapRecord>,
    pub skipped: Option<SkipReason>,
}

/// Advance `group` by `trade`, given the symbol's current `config`. The caller
/// owns persistence: on return, `group` should be saved and marked dirty
/// regardless of `skipped` (spec.md §4.3 step 8 runs even on a skip).
pub fn process_trade(group: &mut CandleGroup, trade: &Trade, config: &SymbolConfig, now: i64) -> ProcessOutcome {
    // Step 2: stage a config change, deferred to the next 1d completion.
    group.stage_pending_config(config.tick_value, config.bin_multiplier, now);

    // Step 3: gap detection against the 1s candle's last-seen trade id.
    let ls_before = group.one_sec().ls;
    let gap_detected = if ls_before > 0 && trade.trade_id > ls_before + 1 {
        Some(GapRecord::new(&group.exchange, &group.symbol, ls_before + 1, trade.trade_id - 1, now))
    } else {
        None
    };
    group.one_sec().ls = ls_before.max(trade.trade_id);

    // Step 4: duplicate / out-of-order skip, measured against the pre-update ls.
    if ls_before > 0 && trade.trade_id <= ls_before {
        let reason = if trade.trade_id == ls_before { SkipReason::Duplicate } else { SkipReason::OutOfOrder };
        return ProcessOutcome { completed: Vec::new(), gap_detected, skipped: Some(reason) };
    }

    // Step 5: footprint eligibility.
    if !trade.is_footprint_eligible() {
        return ProcessOutcome { completed: Vec::new(), gap_detected, skipped: None };
    }

    let mut completed = Vec::new();

    // Step 6: completion check on 1s, then rollup.
    let one_sec_boundary_crossed = {
        let one_sec = group.one_sec();
        Timeframe::OneSec.period_index(trade.timestamp) > Timeframe::OneSec.period_index(one_sec.t)
    };
    if one_sec_boundary_crossed {
        let completed_one_sec = group.one_sec().complete(Timeframe::OneSec);
        let fresh = FootprintCandle::new_empty(&group.exchange, &group.symbol, Timeframe::OneSec, trade.timestamp, group.effective_bin_size());
        *group.one_sec() = fresh;

        completed.push((Timeframe::OneSec, completed_one_sec.clone()));
        completed.extend(rollup::apply(group, &completed_one_sec, trade.timestamp));
    }

    // Step 7: apply the trade to the (possibly just-replaced) open 1s candle.
    group.one_sec().apply_trade(trade.price, trade.quantity, trade.side.is_buy(), trade.trade_id);

    ProcessOutcome { completed, gap_detected, skipped: None }
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

    fn trade(trade_id: u64, timestamp: i64, price: f64) -> Trade {
        Trade {
            symbol: "BTCUSDT".to_string(),
            timestamp,
            trade_id,
            price,
            quantity: 1.0,
            side: crate::domain::market::trade::TradeSide::Buy,
            trade_type: None,
        }
    }

    #[test]
    fn first_trade_applies_cleanly_with_no_gap_or_completion() {
        let mut group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        let outcome = process_trade(&mut group, &trade(1, 1_700_000_000_000, 50_000.0), &config(), 1_700_000_000_000);
        assert!(outcome.gap_detected.is_none());
        assert!(outcome.skipped.is_none());
        assert!(outcome.completed.is_empty());
        assert_eq!(group.one_sec().v, 1.0);
    }

    #[test]
    fn gap_is_detected_on_a_skipped_trade_id() {
        let mut group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        process_trade(&mut group, &trade(1, 1_700_000_000_000, 50_000.0), &config(), 1_700_000_000_000);
        let outcome = process_trade(&mut group, &trade(5, 1_700_000_000_100, 50_001.0), &config(), 1_700_000_000_100);

        let gap = outcome.gap_detected.expect("expected a gap");
        assert_eq!(gap.from_trade_id, 2);
        assert_eq!(gap.to_trade_id, 4);
        assert_eq!(gap.gap_size(), 3);
    }

    #[test]
    fn duplicate_trade_id_is_skipped() {
        let mut group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        process_trade(&mut group, &trade(5, 1_700_000_000_000, 50_000.0), &config(), 1_700_000_000_000);
        let outcome = process_trade(&mut group, &trade(5, 1_700_000_000_100, 50_000.0), &config(), 1_700_000_000_100);
        assert_eq!(outcome.skipped, Some(SkipReason::Duplicate));
    }

    #[test]
    fn crossing_a_one_second_boundary_completes_and_rolls_up() {
        let mut group = CandleGroup::new_default("binance", "BTCUSDT", &config(), 1_700_000_000_000);
        process_trade(&mut group, &trade(1, 1_700_000_000_000, 50_000.0), &config(), 1_700_000_000_000);
        let outcome = process_trade(&mut group, &trade(2, 1_700_000_001_000, 50_100.0), &config(), 1_700_000_001_000);

        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].0, Timeframe::OneSec);
        assert!(outcome.completed[0].1.x);
        // P4: the completed 1s candle is closed-aligned, and the fresh 1s candle
        // the processor swaps in is open-aligned to the new period.
        assert!(outcome.completed[0].1.is_closed_aligned(Timeframe::OneSec));
        assert!(group.candles[&Timeframe::OneSec].is_aligned(Timeframe::OneSec));
        assert_eq!(group.candles[&Timeframe::OneMin].v, 1.0);
    }
}
