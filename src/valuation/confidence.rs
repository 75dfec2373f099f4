//! Confidence scoring with method-dependent caps.
//!
//! The raw score sums evidence bonuses onto a base; the cap then bounds it by
//! how the base value was derived, so a thin market can never report high
//! confidence no matter how complete the request was.

use super::domain::ValuationMethod;

const BASE_CONFIDENCE: i32 = 45;
const NO_MARKET_PENALTY: i32 = -20;

/// Lowest confidence the service ever reports. A result is only produced
/// when the vehicle identity validated, and the depreciation model alone is
/// worth this much; anything lower would read as "ignore this number" while
/// still occupying the 0-100 scale. Zero-evidence runs land exactly here.
const CONFIDENCE_FLOOR: u8 = 25;

/// Hard ceiling when the base value came from the depreciation fallback.
pub const FALLBACK_CONFIDENCE_CAP: u8 = 60;
/// Hard ceiling even for deep-market valuations.
pub const MARKET_CONFIDENCE_CAP: u8 = 95;

/// Evidence gathered by the orchestrator, reduced to what scoring needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceSignals {
    pub comparable_count: usize,
    /// Mean quality score of the included comparables, 0 when none.
    pub average_quality: f64,
    /// Caller supplied a VIN and it matched a comparable exactly.
    pub exact_vin_match: bool,
    /// Caller supplied a VIN at all.
    pub vin_provided: bool,
    pub mileage_provided: bool,
    pub zip_provided: bool,
}

pub fn score(signals: &ConfidenceSignals, method: ValuationMethod) -> u8 {
    apply_method_cap(raw_confidence(signals), method)
}

fn raw_confidence(signals: &ConfidenceSignals) -> i32 {
    let mut confidence = BASE_CONFIDENCE;

    confidence += match signals.comparable_count {
        0 => NO_MARKET_PENALTY,
        1 => 8,
        2 => 12,
        3..=4 => 15,
        _ => 20,
    };

    if signals.comparable_count > 0 {
        if signals.average_quality >= 80.0 {
            confidence += 10;
        } else if signals.average_quality >= 70.0 {
            confidence += 5;
        }
    }

    if signals.exact_vin_match && signals.comparable_count > 0 {
        confidence += 25;
    } else if signals.vin_provided {
        confidence += 5;
    }

    if signals.mileage_provided {
        confidence += 3;
    }
    if signals.zip_provided {
        confidence += 2;
    }

    confidence
}

/// Clamp the raw score into the method's band.
fn apply_method_cap(raw: i32, method: ValuationMethod) -> u8 {
    let cap = match method {
        ValuationMethod::MsrpDepreciationFallback => FALLBACK_CONFIDENCE_CAP,
        ValuationMethod::MarketMedian { comparables } => match comparables {
            0 | 1 => 70,
            2 => 80,
            _ => MARKET_CONFIDENCE_CAP,
        },
    };
    raw.clamp(CONFIDENCE_FLOOR as i32, cap as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> ConfidenceSignals {
        ConfidenceSignals {
            comparable_count: 0,
            average_quality: 0.0,
            exact_vin_match: false,
            vin_provided: false,
            mileage_provided: false,
            zip_provided: false,
        }
    }

    #[test]
    fn no_market_scores_low_but_above_floor() {
        let score = score(&bare(), ValuationMethod::MsrpDepreciationFallback);
        assert_eq!(score, 25); // 45 - 20 = 25, exactly the floor
    }

    #[test]
    fn fallback_is_capped_even_with_rich_request() {
        let signals = ConfidenceSignals {
            comparable_count: 0,
            vin_provided: true,
            mileage_provided: true,
            zip_provided: true,
            ..bare()
        };
        // 45 - 20 + 5 + 3 + 2 = 35, under the cap.
        assert_eq!(
            score(&signals, ValuationMethod::MsrpDepreciationFallback),
            35
        );

        // Even an impossible raw score cannot exceed the fallback cap.
        assert_eq!(
            apply_method_cap(99, ValuationMethod::MsrpDepreciationFallback),
            FALLBACK_CONFIDENCE_CAP
        );
    }

    #[test]
    fn deep_market_with_vin_match_caps_at_ninety_five() {
        let signals = ConfidenceSignals {
            comparable_count: 6,
            average_quality: 85.0,
            exact_vin_match: true,
            vin_provided: true,
            mileage_provided: true,
            zip_provided: true,
        };
        // 45 + 20 + 10 + 25 + 3 + 2 = 105 raw, capped.
        assert_eq!(
            score(&signals, ValuationMethod::MarketMedian { comparables: 6 }),
            MARKET_CONFIDENCE_CAP
        );
    }

    #[test]
    fn thin_market_caps_tighten() {
        let signals = ConfidenceSignals {
            comparable_count: 2,
            average_quality: 85.0,
            exact_vin_match: true,
            vin_provided: true,
            mileage_provided: true,
            zip_provided: true,
        };
        // 45 + 12 + 10 + 25 + 3 + 2 = 97 raw, capped at the 2-comp band.
        assert_eq!(
            score(&signals, ValuationMethod::MarketMedian { comparables: 2 }),
            80
        );

        let one = ConfidenceSignals {
            comparable_count: 1,
            ..signals
        };
        assert_eq!(
            score(&one, ValuationMethod::MarketMedian { comparables: 1 }),
            70
        );
    }

    #[test]
    fn vin_without_market_earns_small_bonus_only() {
        let with_vin = ConfidenceSignals {
            vin_provided: true,
            exact_vin_match: true, // impossible without comparables, ignored
            ..bare()
        };
        let without_vin = bare();
        let a = score(&with_vin, ValuationMethod::MsrpDepreciationFallback);
        let b = score(&without_vin, ValuationMethod::MsrpDepreciationFallback);
        assert_eq!(a - b, 5);
    }

    #[test]
    fn typical_market_scenario_lands_in_expected_band() {
        let signals = ConfidenceSignals {
            comparable_count: 5,
            average_quality: 76.0,
            exact_vin_match: false,
            vin_provided: false,
            mileage_provided: true,
            zip_provided: true,
        };
        let result = score(&signals, ValuationMethod::MarketMedian { comparables: 5 });
        // 45 + 20 + 5 + 3 + 2 = 75.
        assert_eq!(result, 75);
        assert!((75..=95).contains(&result));
    }

    #[test]
    fn score_is_always_within_bounds() {
        for count in 0..10 {
            for quality in [0.0, 65.0, 72.0, 85.0] {
                let signals = ConfidenceSignals {
                    comparable_count: count,
                    average_quality: quality,
                    exact_vin_match: count % 2 == 0,
                    vin_provided: true,
                    mileage_provided: true,
                    zip_provided: true,
                };
                let method = if count >= 3 {
                    ValuationMethod::MarketMedian { comparables: count }
                } else {
                    ValuationMethod::MsrpDepreciationFallback
                };
                let s = score(&signals, method);
                assert!((25..=95).contains(&s));
            }
        }
    }
}
