//! FootprintCandle — one OHLCV candle plus its price-binned buy/sell footprint.

use super::aggs::{Aggs, bin_tick_price};
use super::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

/// A single candle at one timeframe, carrying its footprint bins.
///
/// State machine: `open -> completing -> closed`. `open` permits field updates;
/// `complete()` freezes every field and sets `x = true`; the candle is then replaced
/// in its `CandleGroup` by a fresh empty one for the next period (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintCandle {
    pub exchange: String,
    pub symbol: String,
    /// Timeframe name, e.g. "1s", "1h", "1d".
    pub i: String,
    /// Open time — the aligned period start while `x == false`.
    pub t: i64,
    /// Close time — set only once `x == true`.
    pub ct: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
    pub bv: f64,
    pub sv: f64,
    pub q: f64,
    pub bq: f64,
    pub sq: f64,
    pub n: u64,
    /// Delta: `bv - sv`.
    pub d: f64,
    pub d_max: f64,
    pub d_min: f64,
    /// First trade id applied to this candle instance.
    pub f: u64,
    /// Last trade id applied to this candle instance (monotone non-decreasing, P2).
    pub ls: u64,
    /// Completion flag.
    pub x: bool,
    /// Tick value this candle's bins are keyed at (`effectiveBinSize` at creation).
    pub tv: f64,
    /// Bins sorted ascending by `tp`, uniquely keyed by `tp`.
    pub aggs: Vec<Aggs>,
}

impl FootprintCandle {
    /// A fresh, empty candle for `timeframe` covering the period containing
    /// `timestamp_ms`.
    pub fn new_empty(
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        timestamp_ms: i64,
        effective_bin_size: f64,
    ) -> Self {
        Self {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            i: timeframe.name().to_string(),
            t: timeframe.period_start(timestamp_ms),
            ct: 0,
            o: 0.0,
            h: 0.0,
            l: 0.0,
            c: 0.0,
            v: 0.0,
            bv: 0.0,
            sv: 0.0,
            q: 0.0,
            bq: 0.0,
            sq: 0.0,
            n: 0,
            d: 0.0,
            d_max: 0.0,
            d_min: 0.0,
            f: 0,
            ls: 0,
            x: false,
            tv: effective_bin_size,
            aggs: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Apply one eligible trade to this open candle (spec.md §4.3 step 7).
    pub fn apply_trade(&mut self, price: f64, quantity: f64, is_buy: bool, trade_id: u64) {
        if self.is_empty() {
            self.o = price;
            self.h = price;
            self.l = price;
            self.f = trade_id;
        } else {
            self.h = self.h.max(price);
            self.l = self.l.min(price);
        }
        self.c = price;
        self.v += quantity;
        if is_buy {
            self.bv += quantity;
        } else {
            self.sv += quantity;
        }
        self.n += 1;
        self.d = self.bv - self.sv;
        self.d_max = self.d_max.max(self.d);
        self.d_min = self.d_min.min(self.d);
        self.ls = trade_id;

        let tp = bin_tick_price(price, self.tv);
        match self.aggs.binary_search_by(|b| b.tp.partial_cmp(&tp).unwrap()) {
            Ok(idx) => self.aggs[idx].add(quantity, is_buy),
            Err(idx) => {
                let mut bin = Aggs::new(tp);
                bin.add(quantity, is_buy);
                self.aggs.insert(idx, bin);
            }
        }
    }

    /// Fold a completed lower-timeframe candle's statistics into this open one
    /// (spec.md §4.4 rollup). Takes the completed candle by reference — the caller
    /// is responsible for treating it as an immutable snapshot (spec.md §9: rollup
    /// must not observe later mutation of the source candle).
    pub fn fold(&mut self, completed: &FootprintCandle) {
        if self.is_empty() {
            self.o = completed.o;
            self.h = completed.h;
            self.l = completed.l;
            self.f = completed.f;
        } else {
            self.h = self.h.max(completed.h);
            self.l = self.l.min(completed.l);
        }
        self.c = completed.c;
        self.v += completed.v;
        self.bv += completed.bv;
        self.sv += completed.sv;
        self.q += completed.q;
        self.bq += completed.bq;
        self.sq += completed.sq;
        self.n += completed.n;
        self.d = self.bv - self.sv;
        self.d_max = self.d_max.max(self.d);
        self.d_min = self.d_min.min(self.d);
        self.ls = self.ls.max(completed.ls);

        for src in &completed.aggs {
            match self
                .aggs
                .binary_search_by(|b| b.tp.partial_cmp(&src.tp).unwrap())
            {
                Ok(idx) => self.aggs[idx].merge(src),
                Err(idx) => self.aggs.insert(idx, *src),
            }
        }
    }

    /// Transition `open -> completing -> closed`: freeze fields, set `x = true` and
    /// the final `ct`. Returns the frozen snapshot to emit as a completed event; the
    /// caller replaces this instance with a fresh empty candle (spec.md §4.3 step 6).
    pub fn complete(&mut self, timeframe: Timeframe) -> FootprintCandle {
        self.ct = self.t + timeframe.duration_ms() - 1;
        self.x = true;
        self.clone()
    }

    /// P4: alignment invariant for an open candle.
    pub fn is_aligned(&self, timeframe: Timeframe) -> bool {
        !self.x && self.t == timeframe.period_start(self.t)
    }

    /// P4: alignment invariant for a completed candle.
    pub fn is_closed_aligned(&self, timeframe: Timeframe) -> bool {
        self.x && self.ct == self.t + timeframe.duration_ms() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trade_sets_ohlc_and_bin() {
        let mut candle = FootprintCandle::new_empty("binance", "BTCUSDT", Timeframe::OneSec, 1_700_000_000_000, 0.01);
        candle.apply_trade(50000.0, 0.1, true, 100);
        assert_eq!(candle.o, 50000.0);
        assert_eq!(candle.h, 50000.0);
        assert_eq!(candle.l, 50000.0);
        assert_eq!(candle.c, 50000.0);
        assert_eq!(candle.v, 0.1);
        assert_eq!(candle.bv, 0.1);
        assert_eq!(candle.sv, 0.0);
        assert_eq!(candle.n, 1);
        assert_eq!(candle.f, 100);
        assert_eq!(candle.ls, 100);
        assert_eq!(candle.aggs.len(), 1);
        assert_eq!(candle.aggs[0].tp, 50000.0);
    }

    #[test]
    fn complete_freezes_close_time() {
        let mut candle = FootprintCandle::new_empty("binance", "BTCUSDT", Timeframe::OneSec, 1_700_000_000_000, 0.01);
        assert!(candle.is_aligned(Timeframe::OneSec));
        candle.apply_trade(50000.0, 0.1, true, 100);
        let snapshot = candle.complete(Timeframe::OneSec);
        assert!(snapshot.x);
        assert_eq!(snapshot.ct, 1_700_000_000_000 + 999);
        assert!(candle.x);
        assert!(snapshot.is_closed_aligned(Timeframe::OneSec));
        assert!(!candle.is_aligned(Timeframe::OneSec));
    }

    #[test]
    fn fold_sums_volumes_and_merges_bins() {
        let mut one_sec = FootprintCandle::new_empty("binance", "BTCUSDT", Timeframe::OneSec, 1_700_000_000_000, 10.0);
        one_sec.apply_trade(50000.0, 1.0, true, 1);
        one_sec.apply_trade(50000.0, 0.5, false, 2);
        let completed = one_sec.complete(Timeframe::OneSec);

        let mut one_min = FootprintCandle::new_empty("binance", "BTCUSDT", Timeframe::OneMin, 1_700_000_000_000, 10.0);
        one_min.fold(&completed);

        assert_eq!(one_min.v, 1.5);
        assert_eq!(one_min.bv, 1.0);
        assert_eq!(one_min.sv, 0.5);
        assert_eq!(one_min.n, 2);
        assert_eq!(one_min.aggs.len(), 1);
        assert_eq!(one_min.aggs[0].v, 1.5);
    }
}
