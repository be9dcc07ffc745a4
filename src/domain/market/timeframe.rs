//! Timeframe — the candle periods a footprint candle group is tracked at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the twelve supported candle periods, rolled up from the 1s base candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneSec,
    OneMin,
    ThreeMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
    EightHour,
    TwelveHour,
    OneDay,
}

impl Timeframe {
    /// All timeframes in ascending duration order — the order rollup folds in.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::OneSec,
            Timeframe::OneMin,
            Timeframe::ThreeMin,
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::ThirtyMin,
            Timeframe::OneHour,
            Timeframe::TwoHour,
            Timeframe::FourHour,
            Timeframe::EightHour,
            Timeframe::TwelveHour,
            Timeframe::OneDay,
        ]
    }

    /// Timeframes strictly above 1s, in ascending order — what a 1s completion rolls
    /// up into.
    pub fn rollup_targets() -> &'static [Timeframe] {
        &Self::all()[1..]
    }

    /// Duration of one period, in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::OneSec => 1_000,
            Timeframe::OneMin => 60_000,
            Timeframe::ThreeMin => 3 * 60_000,
            Timeframe::FiveMin => 5 * 60_000,
            Timeframe::FifteenMin => 15 * 60_000,
            Timeframe::ThirtyMin => 30 * 60_000,
            Timeframe::OneHour => 3_600_000,
            Timeframe::TwoHour => 2 * 3_600_000,
            Timeframe::FourHour => 4 * 3_600_000,
            Timeframe::EightHour => 8 * 3_600_000,
            Timeframe::TwelveHour => 12 * 3_600_000,
            Timeframe::OneDay => 86_400_000,
        }
    }

    /// Wire/display name, e.g. "1s", "1m", "4h", "1d" — used as the `i` field on
    /// `FootprintCandle` and in IPC payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Timeframe::OneSec => "1s",
            Timeframe::OneMin => "1m",
            Timeframe::ThreeMin => "3m",
            Timeframe::FiveMin => "5m",
            Timeframe::FifteenMin => "15m",
            Timeframe::ThirtyMin => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHour => "2h",
            Timeframe::FourHour => "4h",
            Timeframe::EightHour => "8h",
            Timeframe::TwelveHour => "12h",
            Timeframe::OneDay => "1d",
        }
    }

    /// The period index a given timestamp falls into: `floor(t / durationMs)`.
    ///
    /// 1d is aligned to UTC midnight like every other timeframe here since
    /// `duration_ms() == 86_400_000` and epoch 0 is UTC midnight — no special case
    /// needed, unlike the teacher's minute-resolution `Timeframe::is_period_start`.
    pub fn period_index(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.duration_ms())
    }

    /// The aligned start of the period containing `timestamp_ms`.
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        self.period_index(timestamp_ms) * self.duration_ms()
    }

    /// `true` if `timestamp_ms` is exactly on a period boundary for this timeframe.
    pub fn is_period_start(&self, timestamp_ms: i64) -> bool {
        timestamp_ms.rem_euclid(self.duration_ms()) == 0
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1s" => Ok(Timeframe::OneSec),
            "1m" => Ok(Timeframe::OneMin),
            "3m" => Ok(Timeframe::ThreeMin),
            "5m" => Ok(Timeframe::FiveMin),
            "15m" => Ok(Timeframe::FifteenMin),
            "30m" => Ok(Timeframe::ThirtyMin),
            "1h" => Ok(Timeframe::OneHour),
            "2h" => Ok(Timeframe::TwoHour),
            "4h" => Ok(Timeframe::FourHour),
            "8h" => Ok(Timeframe::EightHour),
            "12h" => Ok(Timeframe::TwelveHour),
            "1d" => Ok(Timeframe::OneDay),
            _ => anyhow::bail!(
                "invalid timeframe '{}': expected one of 1s,1m,3m,5m,15m,30m,1h,2h,4h,8h,12h,1d",
                s
            ),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_matches_name() {
        assert_eq!(Timeframe::OneSec.duration_ms(), 1_000);
        assert_eq!(Timeframe::OneDay.duration_ms(), 86_400_000);
        assert_eq!(Timeframe::TwelveHour.duration_ms(), 12 * 3_600_000);
    }

    #[test]
    fn from_str_round_trips_name() {
        for tf in Timeframe::all() {
            assert_eq!(Timeframe::from_str(tf.name()).unwrap(), *tf);
        }
        assert!(Timeframe::from_str("2w").is_err());
    }

    #[test]
    fn period_start_aligns_to_duration() {
        let tf = Timeframe::FiveMin;
        let base = 1_700_000_000_000i64 - (1_700_000_000_000i64 % tf.duration_ms());
        assert_eq!(tf.period_start(base), base);
        assert_eq!(tf.period_start(base + 3 * 60_000), base);
        assert_eq!(tf.period_start(base + 5 * 60_000), base + 5 * 60_000);
    }

    #[test]
    fn is_period_start_boundary() {
        let tf = Timeframe::OneSec;
        assert!(tf.is_period_start(1_700_000_000_000));
        assert!(!tf.is_period_start(1_700_000_000_500));
    }

    #[test]
    fn rollup_targets_excludes_one_sec() {
        assert!(!Timeframe::rollup_targets().contains(&Timeframe::OneSec));
        assert_eq!(Timeframe::rollup_targets().len(), Timeframe::all().len() - 1);
    }
}
