//! Consistent symbol→worker assignment (spec.md §4.6): `hash(symbol) mod
//! workerCount`, stable for the life of the pool so one symbol's trades always
//! land on the same worker. No teacher analogue — a pure function in the
//! teacher's free-function domain-logic style (`order_flow.rs`).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn assign(symbol: &str, worker_count: usize) -> usize {
    assert!(worker_count > 0, "worker_count must be positive");
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    (hasher.finish() % worker_count as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_stable_for_the_same_symbol() {
        let first = assign("BTCUSDT", 8);
        let second = assign("BTCUSDT", 8);
        assert_eq!(first, second);
    }

    #[test]
    fn assignment_is_within_bounds() {
        for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT"] {
            assert!(assign(symbol, 4) < 4);
        }
    }
}
