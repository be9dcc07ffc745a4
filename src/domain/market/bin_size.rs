//! Bin-size calculation — "nice" footprint bin widths of the form `k * 10^n` for
//! `k in {1, 2, 2.5, 4, 5}` (spec.md §4.5).

/// Price tier used to pick a target bin percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    Ultra,
    Major,
    LiquidAlt,
    MemeCoin,
}

impl PriceTier {
    pub fn classify(price: f64) -> Self {
        if price >= 50_000.0 {
            PriceTier::Ultra
        } else if price >= 1_000.0 {
            PriceTier::Major
        } else if price >= 1.0 {
            PriceTier::LiquidAlt
        } else {
            PriceTier::MemeCoin
        }
    }

    pub fn target_pct(&self) -> f64 {
        match self {
            PriceTier::Ultra => 0.0001,
            PriceTier::Major => 0.0003,
            PriceTier::LiquidAlt => 0.001,
            PriceTier::MemeCoin => 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BinSizeResult {
    pub nice_bin_size: f64,
    pub bin_multiplier: u32,
    pub tier: PriceTier,
    pub max_bins_enforced: bool,
}

const NICE_FACTORS: [f64; 5] = [1.0, 2.0, 2.5, 4.0, 5.0];
const TOLERANCE: f64 = 1e-9;

/// `true` iff `value` is `k * 10^n` for `k` in `{1, 2, 2.5, 4, 5}`, within a relative
/// tolerance of `1e-9` (spec.md §4.5 invariant).
pub fn is_nice_number(value: f64) -> bool {
    if value <= 0.0 {
        return false;
    }
    let exponent = value.log10().floor();
    for exp_adjust in -1..=1 {
        let exponent = exponent + exp_adjust as f64;
        let scale = 10f64.powf(exponent);
        let k = value / scale;
        for factor in NICE_FACTORS {
            if (k - factor).abs() <= factor.max(1.0) * TOLERANCE {
                return true;
            }
        }
    }
    false
}

/// The smallest nice value `>= target`.
fn smallest_nice_at_least(target: f64) -> f64 {
    if target <= 0.0 {
        return NICE_FACTORS[0];
    }
    let exponent_floor = target.log10().floor() as i32;
    // Search a small window of exponents around the target's magnitude; nice
    // factors span 1..5 per decade so one decade below is always enough headroom.
    for exponent in (exponent_floor - 1)..=(exponent_floor + 1) {
        let scale = 10f64.powi(exponent);
        for factor in NICE_FACTORS {
            let candidate = factor * scale;
            if candidate + candidate * TOLERANCE >= target {
                return candidate;
            }
        }
    }
    target
}

/// The nearest nice multiplier `>= 1` for `target / tv`, used only as the fallback
/// path when no nice value in range is an exact multiple of `tv`.
fn nearest_nice_multiplier(ratio: f64) -> f64 {
    smallest_nice_at_least(ratio.max(NICE_FACTORS[0]))
}

/// Compute the footprint bin size for `price` given the exchange tick `tv`
/// (spec.md §4.5).
pub fn calculate_bin_size(price: f64, tv: f64) -> BinSizeResult {
    let tier = PriceTier::classify(price);
    let raw_target = price * tier.target_pct();
    let floor = price * 0.02 / 200.0;
    let target = raw_target.max(floor);

    // Step 3: smallest nice value >= target that is also an integer multiple of tv.
    // Scan nice candidates in ascending order starting from target's magnitude and
    // take the first that divides evenly by tv.
    let mut found: Option<f64> = None;
    let exponent_floor = target.max(tv).log10().floor() as i32;
    'search: for exponent in (exponent_floor - 2)..=(exponent_floor + 4) {
        let scale = 10f64.powi(exponent);
        for factor in NICE_FACTORS {
            let candidate = factor * scale;
            if candidate + candidate * TOLERANCE < target {
                continue;
            }
            let multiple = candidate / tv;
            let rounded = multiple.round();
            if rounded >= 1.0 && (multiple - rounded).abs() <= rounded.max(1.0) * 1e-6 {
                found = Some(rounded * tv);
                break 'search;
            }
        }
    }

    let (nice_bin_size, max_bins_enforced) = match found {
        Some(size) => (size, raw_target > floor || raw_target < target),
        None => {
            let multiplier = nearest_nice_multiplier(target / tv).clamp(1.0, 100.0);
            (tv * multiplier, true)
        }
    };

    let bin_multiplier = (nice_bin_size / tv).round().max(1.0) as u32;

    BinSizeResult {
        nice_bin_size,
        bin_multiplier,
        tier,
        max_bins_enforced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_price_tiers() {
        assert_eq!(PriceTier::classify(60_000.0), PriceTier::Ultra);
        assert_eq!(PriceTier::classify(5_000.0), PriceTier::Major);
        assert_eq!(PriceTier::classify(10.0), PriceTier::LiquidAlt);
        assert_eq!(PriceTier::classify(0.05), PriceTier::MemeCoin);
    }

    #[test]
    fn nice_number_detection() {
        assert!(is_nice_number(1.0));
        assert!(is_nice_number(2.5));
        assert!(is_nice_number(400.0));
        assert!(is_nice_number(0.025));
        assert!(!is_nice_number(3.0));
        assert!(!is_nice_number(7.0));
    }

    #[test]
    fn bin_size_is_positive_multiple_of_tick() {
        let result = calculate_bin_size(50_000.0, 0.01);
        assert!(result.nice_bin_size > 0.0);
        assert!(result.bin_multiplier >= 1);
        let ratio = result.nice_bin_size / 0.01;
        assert!((ratio - ratio.round()).abs() < 1e-6);
        assert!(is_nice_number(result.nice_bin_size));
    }

    #[test]
    fn bin_multiplier_matches_nice_bin_over_tick() {
        let result = calculate_bin_size(1500.0, 0.1);
        assert_eq!(result.bin_multiplier as f64, (result.nice_bin_size / 0.1).round());
    }
}
