//! Per-symbol trade processor — spec.md §4.3/§4.4, driven one trade at a time.

pub mod rollup;
pub mod trade_processor;

pub use trade_processor::{process_trade, ProcessOutcome, SkipReason};
