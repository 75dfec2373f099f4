//! Listing aggregation and valuation engine.
//!
//! Data flows one way: raw source records are normalized into canonical
//! listings, deduplicated, scored and filtered into a comparable set; a base
//! value is resolved from the market median or the depreciation fallback; the
//! adjustment pipeline applies explained dollar deltas in a fixed order; and
//! the confidence scorer bounds the result by how the base was derived.

pub mod adjustments;
pub mod base_value;
pub mod confidence;
pub mod dedupe;
pub mod domain;
pub mod fallback;
pub mod normalizer;
pub mod quality;
pub mod router;
pub mod service;
pub mod sources;

pub use adjustments::AdjustmentTables;
pub use domain::{
    Adjustment, Condition, FuelType, Listing, ListingSource, ValuationMethod, ValuationRequest,
    ValuationResult,
};
pub use fallback::MsrpTable;
pub use quality::QualityConfig;
pub use router::valuation_router;
pub use service::{ValuationError, ValuationService};
pub use sources::{
    FuelPrice, FuelPriceProvider, ListingProvider, ListingQuery, ProviderError, RawListing,
    StaticFuelPrices, StaticListingProvider,
};
