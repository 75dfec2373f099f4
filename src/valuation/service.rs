//! Orchestrates one valuation run end to end: fan out to listing sources,
//! normalize, dedupe, filter, resolve base value, adjust, score confidence,
//! and assemble the audit-ready result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use tokio::time::timeout;

use super::adjustments::{run_pipeline, AdjustmentContext, AdjustmentTables};
use super::base_value::resolve_base_value;
use super::confidence::{self, ConfidenceSignals};
use super::dedupe::dedupe;
use super::domain::{
    ComparableView, DataQualityTier, ExclusionView, ValuationMeta, ValuationRequest,
    ValuationResult,
};
use super::fallback::{estimate_fallback, MsrpTable};
use super::normalizer::normalize;
use super::quality::{score_and_filter, Partition, QualityConfig};
use super::sources::{FuelPriceProvider, ListingProvider, ListingQuery, RawListing};

const MARKET_RANGE_PCT: f64 = 0.08;
const FALLBACK_RANGE_PCT: f64 = 0.15;

/// The only hard failures; everything else degrades into warnings.
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("model year {0} is outside the supported range")]
    InvalidYear(i32),
}

/// Composes injected providers and versioned tables. The service holds no
/// mutable state; every run is a pure function of its inputs plus `as_of`.
pub struct ValuationService {
    providers: Vec<Arc<dyn ListingProvider>>,
    fuel_prices: Arc<dyn FuelPriceProvider>,
    msrp: MsrpTable,
    tables: AdjustmentTables,
    quality: QualityConfig,
    source_timeout: Duration,
}

impl ValuationService {
    pub fn new(
        providers: Vec<Arc<dyn ListingProvider>>,
        fuel_prices: Arc<dyn FuelPriceProvider>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            fuel_prices,
            msrp: MsrpTable::default(),
            tables: AdjustmentTables::default(),
            quality: QualityConfig::default(),
            source_timeout,
        }
    }

    pub fn with_tables(
        mut self,
        msrp: MsrpTable,
        tables: AdjustmentTables,
        quality: QualityConfig,
    ) -> Self {
        self.msrp = msrp;
        self.tables = tables;
        self.quality = quality;
        self
    }

    /// Valuate against the current clock.
    pub async fn valuate(
        &self,
        request: ValuationRequest,
    ) -> Result<ValuationResult, ValuationError> {
        self.valuate_at(request, Utc::now()).await
    }

    /// Valuate as of a fixed instant. Same request, same provider payloads,
    /// and same `as_of` always produce the same result.
    pub async fn valuate_at(
        &self,
        request: ValuationRequest,
        as_of: DateTime<Utc>,
    ) -> Result<ValuationResult, ValuationError> {
        validate(&request)?;

        let query = ListingQuery {
            year: request.year,
            make: request.make.clone(),
            model: request.model.clone(),
            trim: request.trim.clone(),
            vin: request.vin.clone(),
            zip_code: request.zip_code.clone(),
            radius_miles: request.radius_miles,
        };

        let (raw_listings, mut warnings) = self.fetch_all(&query).await;
        let listings: Vec<_> = raw_listings.iter().filter_map(normalize).collect();
        let listings_found = listings.len();
        let deduped = dedupe(listings);

        let mut quality_config = self.quality.clone();
        if let Some(radius) = request.radius_miles {
            quality_config.radius_miles = radius;
        }
        let partition = score_and_filter(
            deduped,
            request.zip_code.as_deref(),
            as_of.date_naive(),
            &quality_config,
        );

        let as_of_year = as_of.year();
        let fallback_value = estimate_fallback(&request, &self.msrp, as_of_year);
        let base = resolve_base_value(&partition.included, fallback_value);
        if base.method.is_fallback() {
            warnings.push(if partition.included.is_empty() {
                "no comparable listings found; using depreciation fallback".to_string()
            } else {
                format!(
                    "only {} comparable listing(s); using depreciation fallback",
                    partition.included.len()
                )
            });
        }

        let fuel_price = match request.fuel_type {
            Some(fuel) => {
                self.fuel_prices
                    .price(request.zip_code.as_deref(), fuel)
                    .await
            }
            None => None,
        };

        let ctx = AdjustmentContext {
            request: &request,
            base_value: base.value,
            as_of_year,
            fuel_price: fuel_price.as_ref(),
        };
        let adjustments = run_pipeline(&ctx, &self.tables);

        let base_value = base.value.round();
        let adjustment_total: f64 = adjustments.iter().map(|a| a.impact).sum();
        let estimated_value = base_value + adjustment_total;

        let exact_vin_match = match request.vin.as_deref() {
            Some(vin) => partition.included.iter().any(|scored| {
                scored
                    .listing
                    .vin
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(vin))
            }),
            None => false,
        };

        let signals = ConfidenceSignals {
            comparable_count: partition.included.len(),
            average_quality: partition.average_quality(),
            exact_vin_match,
            vin_provided: request.vin.is_some(),
            mileage_provided: request.mileage.is_some(),
            zip_provided: request.zip_code.is_some(),
        };
        let confidence_score = confidence::score(&signals, base.method);

        let range_pct = if base.method.is_fallback() {
            FALLBACK_RANGE_PCT
        } else {
            MARKET_RANGE_PCT
        };
        let price_range = (
            (estimated_value * (1.0 - range_pct)).round() as i64,
            (estimated_value * (1.0 + range_pct)).round() as i64,
        );

        let real_listing_count = partition
            .included
            .iter()
            .filter(|scored| !scored.listing.estimated)
            .count();
        let trust_score = aggregate_trust(real_listing_count);
        let data_quality = data_quality_tier(&partition);

        tracing::info!(
            year = request.year,
            make = %request.make,
            model = %request.model,
            listings_found,
            comparables = partition.included.len(),
            method = %base.method.label(),
            confidence = confidence_score,
            estimated_value = estimated_value as i64,
            "valuation complete"
        );

        Ok(ValuationResult {
            estimated_value: estimated_value as i64,
            base_value: base_value as i64,
            price_range,
            confidence_score,
            valuation_method: base.method.label(),
            adjustments,
            market_listings: partition
                .included
                .iter()
                .map(comparable_view)
                .collect(),
            excluded_listings: partition
                .excluded
                .iter()
                .map(|excluded| ExclusionView {
                    id: excluded.listing.id.clone(),
                    source: excluded.listing.source.label().to_string(),
                    price: excluded.listing.price,
                    reason: excluded.reason.clone(),
                })
                .collect(),
            trust_score,
            meta: ValuationMeta {
                listings_found,
                comparables_used: partition.included.len(),
                real_listing_count,
                exact_vin_match,
                fallback_used: base.method.is_fallback(),
                data_quality,
                warnings,
            },
        })
    }

    /// Fan out to every provider concurrently. A slow or failing source
    /// contributes zero listings and a warning, never an error.
    async fn fetch_all(&self, query: &ListingQuery) -> (Vec<RawListing>, Vec<String>) {
        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let query = query.clone();
            let deadline = self.source_timeout;
            handles.push(tokio::spawn(async move {
                let name = provider.name().to_string();
                match timeout(deadline, provider.fetch(&query)).await {
                    Ok(Ok(records)) => (name, Ok(records)),
                    Ok(Err(err)) => (name, Err(err.to_string())),
                    Err(_) => (name, Err(format!("timed out after {deadline:?}"))),
                }
            }));
        }

        let mut raw_listings = Vec::new();
        let mut warnings = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((name, Ok(records))) => {
                    tracing::debug!(source = %name, count = records.len(), "source responded");
                    raw_listings.extend(records);
                }
                Ok((name, Err(detail))) => {
                    tracing::warn!(source = %name, error = %detail, "source unavailable");
                    warnings.push(format!("source {name} unavailable: {detail}"));
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "source task panicked");
                    warnings.push("a listing source task failed unexpectedly".to_string());
                }
            }
        }
        (raw_listings, warnings)
    }
}

fn validate(request: &ValuationRequest) -> Result<(), ValuationError> {
    if request.make.trim().is_empty() {
        return Err(ValuationError::MissingField("make"));
    }
    if request.model.trim().is_empty() {
        return Err(ValuationError::MissingField("model"));
    }
    if !(1900..=2100).contains(&request.year) {
        return Err(ValuationError::InvalidYear(request.year));
    }
    Ok(())
}

/// Aggregate believability of the comparable set: grows with each real
/// listing, saturating well short of certainty.
fn aggregate_trust(real_listing_count: usize) -> f64 {
    if real_listing_count == 0 {
        0.35
    } else {
        (0.5 + real_listing_count as f64 * 0.05).min(0.85)
    }
}

fn data_quality_tier(partition: &Partition) -> DataQualityTier {
    let count = partition.included.len();
    if count >= 5 && partition.average_quality() >= 75.0 {
        DataQualityTier::Rich
    } else if count >= 3 {
        DataQualityTier::Moderate
    } else {
        DataQualityTier::Sparse
    }
}

fn comparable_view(scored: &super::quality::ScoredListing) -> ComparableView {
    let listing = &scored.listing;
    ComparableView {
        id: listing.id.clone(),
        vin: listing.vin.clone(),
        year: listing.year,
        make: listing.make.clone(),
        model: listing.model.clone(),
        price: listing.price,
        mileage: listing.mileage,
        source: listing.source.label().to_string(),
        url: listing.url.clone(),
        listing_type: if listing.estimated { "estimate" } else { "live" }.to_string(),
        quality_score: scored.quality_score,
        trust_score: listing.trust_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_blank_identity() {
        assert!(matches!(
            validate(&ValuationRequest::new(2021, " ", "F-150")),
            Err(ValuationError::MissingField("make"))
        ));
        assert!(matches!(
            validate(&ValuationRequest::new(2021, "Ford", "")),
            Err(ValuationError::MissingField("model"))
        ));
        assert!(matches!(
            validate(&ValuationRequest::new(1885, "Benz", "Motorwagen")),
            Err(ValuationError::InvalidYear(1885))
        ));
        assert!(validate(&ValuationRequest::new(2021, "Ford", "F-150")).is_ok());
    }

    #[test]
    fn trust_saturates_with_listing_count() {
        assert_eq!(aggregate_trust(0), 0.35);
        assert_eq!(aggregate_trust(1), 0.55);
        assert_eq!(aggregate_trust(5), 0.75);
        assert_eq!(aggregate_trust(20), 0.85);
    }
}
