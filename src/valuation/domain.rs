use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Marketplaces the normalizer recognizes. Anything else maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    CarMax,
    Carvana,
    AutoTrader,
    CarsDotCom,
    CarGurus,
    Craigslist,
    FacebookMarketplace,
    EbayMotors,
    Other,
}

impl ListingSource {
    pub fn from_raw(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            s if s.contains("carmax") => Self::CarMax,
            s if s.contains("carvana") => Self::Carvana,
            s if s.contains("autotrader") => Self::AutoTrader,
            s if s.contains("cars.com") || s == "cars" => Self::CarsDotCom,
            s if s.contains("cargurus") => Self::CarGurus,
            s if s.contains("craigslist") => Self::Craigslist,
            s if s.contains("facebook") => Self::FacebookMarketplace,
            s if s.contains("ebay") => Self::EbayMotors,
            _ => Self::Other,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CarMax => "carmax",
            Self::Carvana => "carvana",
            Self::AutoTrader => "autotrader",
            Self::CarsDotCom => "cars.com",
            Self::CarGurus => "cargurus",
            Self::Craigslist => "craigslist",
            Self::FacebookMarketplace => "facebook_marketplace",
            Self::EbayMotors => "ebay_motors",
            Self::Other => "other",
        }
    }

    /// Trust tier: 1 for national dealers with verified inventory feeds,
    /// 2 for established aggregators, 3 for everything else.
    pub const fn trust_tier(self) -> u8 {
        match self {
            Self::CarMax | Self::Carvana => 1,
            Self::AutoTrader | Self::CarsDotCom | Self::CarGurus => 2,
            Self::Craigslist | Self::FacebookMarketplace | Self::EbayMotors | Self::Other => 3,
        }
    }
}

/// Canonical listing entity produced by the normalizer. Immutable once built;
/// the deduplicator discards inferior duplicates but never mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub vin: Option<String>,
    pub year: Option<i32>,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    /// USD after currency normalization. Malformed prices coerce to 0.0 and
    /// are excluded downstream by the quality filter.
    pub price: f64,
    pub mileage: Option<f64>,
    pub source: ListingSource,
    pub url: Option<String>,
    pub dealer: Option<String>,
    pub location: Option<String>,
    pub zip: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub listed_at: Option<NaiveDate>,
    pub photo_count: u32,
    /// Whether the record is a synthesized estimate rather than a real ad.
    pub estimated: bool,
    /// Per-listing believability in [0, 1]; defaults to 0.5.
    pub trust_score: f64,
}

/// Reported vehicle condition. `Good` is the neutral baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "excellent" => Some(Self::Excellent),
            "very good" => Some(Self::VeryGood),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::VeryGood => "very good",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Gasoline,
    Premium,
    Diesel,
    Hybrid,
    Electric,
}

impl FuelType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::Premium => "premium",
            Self::Diesel => "diesel",
            Self::Hybrid => "hybrid",
            Self::Electric => "electric",
        }
    }
}

/// Vehicle identity plus optional attributes submitted by the caller.
/// `year`, `make`, and `model` are the only hard requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub mileage: Option<f64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub fuel_type: Option<FuelType>,
    #[serde(default)]
    pub accidents: Option<u8>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl ValuationRequest {
    pub fn new(year: i32, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            year,
            make: make.into(),
            model: model.into(),
            trim: None,
            vin: None,
            mileage: None,
            condition: None,
            zip_code: None,
            radius_miles: None,
            fuel_type: None,
            accidents: None,
            features: Vec::new(),
        }
    }

    pub fn vehicle_age(&self, as_of_year: i32) -> i32 {
        (as_of_year - self.year).max(0)
    }
}

/// One signed, explained dollar delta applied to the base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub factor: String,
    /// Whole dollars, signed. Rounded once at construction so the adjustment
    /// sum reconciles exactly against `estimated_value - base_value`.
    pub impact: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_adjustment: Option<f64>,
}

impl Adjustment {
    pub fn new(factor: &str, impact: f64, description: String, base_value: f64) -> Self {
        let impact = impact.round();
        let percent_adjustment = if base_value > 0.0 {
            Some(impact / base_value * 100.0)
        } else {
            None
        };
        Self {
            factor: factor.to_string(),
            impact,
            description,
            percent_adjustment,
        }
    }

    /// A zero-impact entry carrying only its explanatory note.
    pub fn neutral(factor: &str, description: String) -> Self {
        Self {
            factor: factor.to_string(),
            impact: 0.0,
            description,
            percent_adjustment: None,
        }
    }
}

/// How the base value was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationMethod {
    MarketMedian { comparables: usize },
    MsrpDepreciationFallback,
}

impl ValuationMethod {
    pub fn label(&self) -> String {
        match self {
            Self::MarketMedian { comparables } => {
                format!("market_median_{comparables}_listings")
            }
            Self::MsrpDepreciationFallback => "msrp_depreciation_fallback".to_string(),
        }
    }

    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::MsrpDepreciationFallback)
    }
}

/// Display-ready comparable carried on the result for audit panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub make: String,
    pub model: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<f64>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub listing_type: String,
    pub quality_score: u8,
    pub trust_score: f64,
}

/// Why a listing was left out of the comparable set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionView {
    pub id: String,
    pub source: String,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityTier {
    Rich,
    Moderate,
    Sparse,
}

/// Audit counters assembled by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationMeta {
    pub listings_found: usize,
    pub comparables_used: usize,
    pub real_listing_count: usize,
    pub exact_vin_match: bool,
    pub fallback_used: bool,
    pub data_quality: DataQualityTier,
    pub warnings: Vec<String>,
}

/// Immutable snapshot returned by one valuation run. Field names are rendered
/// directly by downstream consumers (report export, audit panels) and must
/// stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub estimated_value: i64,
    pub base_value: i64,
    pub price_range: (i64, i64),
    pub confidence_score: u8,
    pub valuation_method: String,
    pub adjustments: Vec<Adjustment>,
    pub market_listings: Vec<ComparableView>,
    pub excluded_listings: Vec<ExclusionView>,
    /// Aggregate believability of the comparable set, in [0, 1].
    pub trust_score: f64,
    pub meta: ValuationMeta,
}
