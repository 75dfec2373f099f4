//! Scores listings on completeness and trustworthiness, then partitions them
//! into the comparable set and an excluded set with machine-checkable reasons.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::Listing;

/// Inclusion thresholds, injected so they can be tuned and tested apart from
/// the scoring algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Listings scoring below this are excluded from the comparable set.
    pub min_quality: u8,
    /// Sane price band; prices outside it are treated as data errors.
    pub min_price: f64,
    pub max_price: f64,
    /// Comparables farther than this from the requested ZIP are excluded.
    pub radius_miles: f64,
    /// Listings older than this many days are considered stale.
    pub stale_days: i64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_quality: 60,
            min_price: 5_000.0,
            max_price: 100_000.0,
            radius_miles: 100.0,
            stale_days: 30,
        }
    }
}

/// An included listing annotated with its quality score. The score is
/// informational; it never reorders the comparable set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredListing {
    pub listing: Listing,
    pub quality_score: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedListing {
    pub listing: Listing,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    pub included: Vec<ScoredListing>,
    pub excluded: Vec<ExcludedListing>,
}

impl Partition {
    pub fn average_quality(&self) -> f64 {
        if self.included.is_empty() {
            return 0.0;
        }
        let total: u32 = self
            .included
            .iter()
            .map(|scored| scored.quality_score as u32)
            .sum();
        total as f64 / self.included.len() as f64
    }
}

/// Deterministic partition: same listings, thresholds, and `as_of` date
/// always produce the same split.
pub fn score_and_filter(
    listings: Vec<Listing>,
    target_zip: Option<&str>,
    as_of: NaiveDate,
    config: &QualityConfig,
) -> Partition {
    let mut partition = Partition::default();

    for listing in listings {
        let quality_score = quality_score(&listing, as_of, config);

        match exclusion_reason(&listing, quality_score, target_zip, as_of, config) {
            Some(reason) => partition.excluded.push(ExcludedListing { listing, reason }),
            None => partition.included.push(ScoredListing {
                listing,
                quality_score,
            }),
        }
    }

    partition
}

fn exclusion_reason(
    listing: &Listing,
    quality_score: u8,
    target_zip: Option<&str>,
    as_of: NaiveDate,
    config: &QualityConfig,
) -> Option<String> {
    if !(listing.price > 0.0) {
        return Some("price_not_positive".to_string());
    }

    if listing.price < config.min_price || listing.price > config.max_price {
        return Some(format!(
            "price_out_of_band:${:.0} outside ${:.0}-${:.0}",
            listing.price, config.min_price, config.max_price
        ));
    }

    if quality_score < config.min_quality {
        return Some(format!(
            "quality_below_threshold:{quality_score}<{}",
            config.min_quality
        ));
    }

    if let (Some(target), Some(listing_zip)) = (target_zip, listing.zip.as_deref()) {
        if let Some(distance) = zip_prefix_distance(target, listing_zip) {
            if distance > config.radius_miles {
                return Some(format!(
                    "out_of_radius:{distance:.0}mi>{:.0}mi",
                    config.radius_miles
                ));
            }
        }
    }

    if let Some(listed_at) = listing.listed_at {
        let age_days = (as_of - listed_at).num_days();
        if age_days > config.stale_days {
            return Some(format!("stale_listing:{age_days}d>{}d", config.stale_days));
        }
    }

    None
}

/// Bounded 0-100 completeness/trust score.
fn quality_score(listing: &Listing, as_of: NaiveDate, config: &QualityConfig) -> u8 {
    let mut score: u32 = 0;

    if listing.price >= config.min_price && listing.price <= config.max_price {
        score += 20;
    }
    if listing.mileage.map(|m| m > 0.0).unwrap_or(false) {
        score += 15;
    }
    if listing.vin.is_some() {
        score += 15;
    }
    if listing.year.is_some() && !listing.make.is_empty() && !listing.model.is_empty() {
        score += 15;
    }
    if listing.zip.is_some() || listing.location.as_deref().map(str::len).unwrap_or(0) > 3 {
        score += 10;
    }
    if listing.dealer.is_some() {
        score += 10;
    }

    score += match listing.photo_count {
        0 => 0,
        1..=3 => 2,
        4..=7 => 4,
        _ => 6,
    };

    if let Some(listed_at) = listing.listed_at {
        let age_days = (as_of - listed_at).num_days();
        score += match age_days {
            days if days <= 7 => 9,
            days if days <= 14 => 6,
            days if days <= 30 => 3,
            _ => 0,
        };
    }

    score += match listing.source.trust_tier() {
        1 => 5,
        2 => 3,
        _ => 0,
    };

    score.min(100) as u8
}

/// Coarse ZIP distance: 3-digit prefix delta, about 100 miles per step.
/// Returns `None` for malformed ZIPs so they never hard-exclude a listing.
fn zip_prefix_distance(a: &str, b: &str) -> Option<f64> {
    let prefix = |zip: &str| -> Option<i64> {
        let digits: String = zip.trim().chars().take(3).collect();
        (digits.len() == 3 && digits.chars().all(|c| c.is_ascii_digit()))
            .then(|| digits.parse().ok())
            .flatten()
    };

    Some(((prefix(a)? - prefix(b)?).abs() * 100) as f64)
}
