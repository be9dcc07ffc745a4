//! Rollup orchestration — folds a completed 1s candle up through every higher
//! timeframe and applies a staged config change at 1d completion (spec.md §4.4).
//!
//! The cascade itself and the pending-config swap are domain operations
//! (`CandleGroup::rollup`, `CandleGroup::apply_pending_config_if_due`); this
//! module just sequences them the way the trade processor needs.

use crate::domain::market::candle_group::CandleGroup;
use crate::domain::market::footprint_candle::FootprintCandle;
use crate::domain::market::timeframe::Timeframe;

/// Rolls `completed_one_sec` into every open higher timeframe, then swaps in a
/// freshly configured group if the 1d candle just closed and a config change is
/// staged. Returns every completion produced by the cascade (1s excluded — the
/// caller already has that snapshot).
pub fn apply(group: &mut CandleGroup, completed_one_sec: &FootprintCandle, trade_timestamp_ms: i64) -> Vec<(Timeframe, FootprintCandle)> {
    let completions = group.rollup(completed_one_sec, trade_timestamp_ms);
    group.apply_pending_config_if_due(&completions, trade_timestamp_ms);
    completions
}
