//! Aggs — a single price-bin aggregation of buy/sell volume within a candle.

use serde::{Deserialize, Serialize};

/// Buy/sell volume aggregated at one price tick bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggs {
    /// Tick price — always a multiple of the candle group's `effectiveBinSize`.
    pub tp: f64,
    pub bv: f64,
    pub sv: f64,
    pub v: f64,
    pub bq: Option<f64>,
    pub sq: Option<f64>,
    pub q: Option<f64>,
}

impl Aggs {
    pub fn new(tp: f64) -> Self {
        Self {
            tp,
            bv: 0.0,
            sv: 0.0,
            v: 0.0,
            bq: None,
            sq: None,
            q: None,
        }
    }

    /// Add a buy or sell quantity to this bin, keeping `v == bv + sv`.
    pub fn add(&mut self, quantity: f64, is_buy: bool) {
        if is_buy {
            self.bv += quantity;
        } else {
            self.sv += quantity;
        }
        self.v = self.bv + self.sv;
    }

    /// Fold another bin's volumes into this one (used by rollup, spec.md §4.4).
    pub fn merge(&mut self, other: &Aggs) {
        self.bv += other.bv;
        self.sv += other.sv;
        self.v = self.bv + self.sv;
        if let Some(oq) = other.bq {
            self.bq = Some(self.bq.unwrap_or(0.0) + oq);
        }
        if let Some(oq) = other.sq {
            self.sq = Some(self.sq.unwrap_or(0.0) + oq);
        }
        if let Some(oq) = other.q {
            self.q = Some(self.q.unwrap_or(0.0) + oq);
        }
    }

    /// P5: volumes are non-negative and self-consistent within floating-point
    /// tolerance, and `tp` lands on the bin grid.
    pub fn is_valid(&self, effective_bin_size: f64, epsilon: f64) -> bool {
        self.bv >= 0.0
            && self.sv >= 0.0
            && (self.v - (self.bv + self.sv)).abs() <= epsilon
            && effective_bin_size > 0.0
            && ((self.tp / effective_bin_size).round() * effective_bin_size - self.tp).abs() < epsilon
    }
}

/// `floor(price / effectiveBinSize) * effectiveBinSize` — a price exactly on a bin
/// boundary maps to that bin (the lower one), per spec.md §8 boundary behaviors.
pub fn bin_tick_price(price: f64, effective_bin_size: f64) -> f64 {
    (price / effective_bin_size).floor() * effective_bin_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_tick_price_floors_to_lower_bin() {
        assert_eq!(bin_tick_price(50000.0, 10.0), 50000.0);
        assert_eq!(bin_tick_price(50009.9, 10.0), 50000.0);
        assert_eq!(bin_tick_price(50010.0, 10.0), 50010.0);
    }

    #[test]
    fn add_keeps_total_consistent() {
        let mut bin = Aggs::new(100.0);
        bin.add(1.5, true);
        bin.add(0.5, false);
        assert_eq!(bin.bv, 1.5);
        assert_eq!(bin.sv, 0.5);
        assert_eq!(bin.v, 2.0);
    }

    #[test]
    fn merge_sums_volumes() {
        let mut a = Aggs::new(100.0);
        a.add(1.0, true);
        let mut b = Aggs::new(100.0);
        b.add(2.0, true);
        b.add(1.0, false);
        a.merge(&b);
        assert_eq!(a.bv, 3.0);
        assert_eq!(a.sv, 1.0);
        assert_eq!(a.v, 4.0);
    }

    #[test]
    fn is_valid_rejects_off_grid_tick() {
        let bin = Aggs::new(105.0);
        assert!(!bin.is_valid(10.0, 1e-9));
        let bin = Aggs::new(100.0);
        assert!(bin.is_valid(10.0, 1e-9));
    }

    #[test]
    fn is_valid_rejects_off_grid_tick_that_rounds_down() {
        // 104 / 10 = 10.4, rounds to 10 -> nearest grid point is 100, below tp.
        // A signed-difference check would pass this (100 - 104 = -4 < epsilon).
        let bin = Aggs::new(104.0);
        assert!(!bin.is_valid(10.0, 1e-9));
    }
}
