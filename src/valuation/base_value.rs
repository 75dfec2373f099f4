//! Resolves the pre-adjustment base value from the comparable set, or routes
//! to the depreciation fallback when the market is too thin.

use super::domain::ValuationMethod;
use super::quality::ScoredListing;

/// Fewer comparables than this and the market median is not trustworthy
/// enough to anchor a valuation.
pub const MIN_COMPARABLES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct BaseValue {
    pub value: f64,
    pub method: ValuationMethod,
}

/// Market median when the comparable set is deep enough, else the caller
/// falls back to the depreciation estimate it supplies.
pub fn resolve_base_value(comparables: &[ScoredListing], fallback_value: f64) -> BaseValue {
    if comparables.len() >= MIN_COMPARABLES {
        let prices: Vec<f64> = comparables
            .iter()
            .map(|scored| scored.listing.price)
            .collect();
        BaseValue {
            value: median(&prices),
            method: ValuationMethod::MarketMedian {
                comparables: comparables.len(),
            },
        }
    } else {
        BaseValue {
            value: fallback_value,
            method: ValuationMethod::MsrpDepreciationFallback,
        }
    }
}

/// Median resistant to outlier listings. Even counts average the middle two.
fn median(prices: &[f64]) -> f64 {
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::domain::{Listing, ListingSource};

    fn scored(price: f64) -> ScoredListing {
        ScoredListing {
            listing: Listing {
                id: format!("id-{price}"),
                vin: None,
                year: Some(2021),
                make: "Ford".to_string(),
                model: "F-150".to_string(),
                trim: None,
                price,
                mileage: Some(60_000.0),
                source: ListingSource::AutoTrader,
                url: None,
                dealer: None,
                location: None,
                zip: None,
                fetched_at: None,
                listed_at: None,
                photo_count: 0,
                estimated: false,
                trust_score: 0.6,
            },
            quality_score: 75,
        }
    }

    #[test]
    fn odd_count_takes_exact_middle() {
        let comps = vec![scored(41_000.0), scored(48_000.0), scored(45_000.0)];
        let base = resolve_base_value(&comps, 30_000.0);
        assert_eq!(base.value, 45_000.0);
        assert_eq!(
            base.method,
            ValuationMethod::MarketMedian { comparables: 3 }
        );
    }

    #[test]
    fn even_count_averages_middle_two() {
        let comps = vec![
            scored(40_000.0),
            scored(42_000.0),
            scored(46_000.0),
            scored(50_000.0),
        ];
        let base = resolve_base_value(&comps, 30_000.0);
        assert_eq!(base.value, 44_000.0);
    }

    #[test]
    fn median_ignores_outlier_pull() {
        let comps = vec![scored(40_000.0), scored(41_000.0), scored(99_000.0)];
        let base = resolve_base_value(&comps, 30_000.0);
        assert_eq!(base.value, 41_000.0);
    }

    #[test]
    fn thin_market_routes_to_fallback() {
        let comps = vec![scored(40_000.0), scored(41_000.0)];
        let base = resolve_base_value(&comps, 28_500.0);
        assert_eq!(base.value, 28_500.0);
        assert!(base.method.is_fallback());

        let empty = resolve_base_value(&[], 28_500.0);
        assert!(empty.method.is_fallback());
    }

    #[test]
    fn boundary_of_three_uses_market() {
        let comps = vec![scored(20_000.0), scored(21_000.0), scored(22_000.0)];
        assert!(!resolve_base_value(&comps, 10_000.0).method.is_fallback());
    }
}
