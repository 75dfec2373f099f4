use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoval::valuation::{
    valuation_router, FuelPrice, FuelPriceProvider, FuelType, ListingProvider, ListingQuery,
    ProviderError, RawListing, StaticFuelPrices, StaticListingProvider, ValuationRequest,
    ValuationService,
};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).single().expect("valid instant")
}

/// Five-comparable F-150 market with listing dates pinned relative to `base`,
/// so the fixture never goes stale no matter when the tests run.
fn f150_market_at(base: NaiveDate) -> StaticListingProvider {
    let listed = |days_ago: i64| (base - ChronoDuration::days(days_ago)).to_string();
    StaticListingProvider::new(
        "sample_market",
        vec![
            json!({
                "url": "https://www.autotrader.com/cars-for-sale/vehicle/101",
                "price": 41_000, "mileage": 72_000, "year": 2021,
                "make": "Ford", "model": "F-150", "trim": "XLT",
                "source": "autotrader", "zip": "95821",
                "dealer": "Capitol Ford", "photo_count": 12,
                "listedAt": listed(6)
            }),
            json!({
                "url": "https://www.carmax.com/car/102",
                "price": 43_000, "mileage": 65_000, "year": 2021,
                "make": "Ford", "model": "F-150", "trim": "XLT",
                "vin": "1FTFW1E52MFA10001",
                "source": "carmax", "zip": "95825",
                "dealer": "CarMax Sacramento", "photo_count": 20,
                "listedAt": listed(5)
            }),
            json!({
                "link": "https://www.carvana.com/vehicle/103",
                "listing_price": "$45,000", "odometer": 58_000, "year": 2021,
                "make": "Ford", "model": "F-150", "trim": "Lariat",
                "site": "carvana", "zipCode": "95814",
                "seller": "Carvana", "photoCount": 18,
                "listing_date": listed(4)
            }),
            json!({
                "url": "https://www.cars.com/vehicledetail/104",
                "price": 46_000, "mileage": 52_000, "year": 2021,
                "make": "Ford", "model": "F-150", "trim": "Lariat",
                "source": "cars.com", "zip": "95835",
                "dealer": "Folsom Lake Ford", "photo_count": 15,
                "listedAt": listed(3)
            }),
            json!({
                "url": "https://www.cargurus.com/Cars/link/105",
                "price": 48_000, "mileage": 41_000, "year": 2021,
                "make": "Ford", "model": "F-150", "trim": "Lariat",
                "source": "cargurus", "zip": "95816",
                "dealer": "Elk Grove Ford", "photo_count": 9,
                "listedAt": listed(2)
            }),
            json!({
                "url": "https://sacramento.craigslist.org/cto/106",
                "price": 0, "year": 2021, "make": "Ford", "model": "F-150",
                "source": "craigslist", "zip": "95820"
            }),
        ],
    )
}

fn f150_market() -> StaticListingProvider {
    f150_market_at(as_of().date_naive())
}

fn service_with(provider: StaticListingProvider) -> ValuationService {
    ValuationService::new(
        vec![Arc::new(provider)],
        Arc::new(StaticFuelPrices),
        Duration::from_secs(5),
    )
}

fn f150_request() -> ValuationRequest {
    let mut request = ValuationRequest::new(2021, "Ford", "F-150");
    request.mileage = Some(84_000.0);
    request.zip_code = Some("95821".to_string());
    request
}

#[tokio::test]
async fn market_valuation_anchors_on_median_with_audit_trail() {
    let service = service_with(f150_market());
    let result = service
        .valuate_at(f150_request(), as_of())
        .await
        .expect("valid request succeeds");

    assert_eq!(result.base_value, 45_000);
    assert_eq!(result.valuation_method, "market_median_5_listings");
    assert_eq!(result.meta.comparables_used, 5);
    assert!(!result.meta.fallback_used);

    // 84,000 actual vs 48,000 expected for a 4-year-old truck.
    let mileage = result
        .adjustments
        .iter()
        .find(|a| a.factor == "Mileage")
        .expect("mileage adjustment present");
    assert_eq!(mileage.impact, -4_320.0);
    assert!(mileage.description.contains("84,000"));
    assert!(mileage.description.contains("48,000"));

    assert!(
        (75..=95).contains(&result.confidence_score),
        "confidence {} outside expected band",
        result.confidence_score
    );

    // Zero-price craigslist record is excluded, with the reason recorded.
    let excluded = result
        .excluded_listings
        .iter()
        .find(|e| e.source == "craigslist")
        .expect("craigslist record excluded");
    assert_eq!(excluded.reason, "price_not_positive");

    assert!(result.price_range.0 < result.estimated_value);
    assert!(result.price_range.1 > result.estimated_value);
}

#[tokio::test]
async fn adjustment_sum_reconciles_exactly() {
    let service = service_with(f150_market());
    let mut request = f150_request();
    request.condition = Some(autoval::valuation::Condition::Excellent);
    request.fuel_type = Some(FuelType::Gasoline);
    request.accidents = Some(1);
    request.features = vec!["leather".to_string(), "towing package".to_string()];

    let result = service
        .valuate_at(request, as_of())
        .await
        .expect("succeeds");

    let total: f64 = result.adjustments.iter().map(|a| a.impact).sum();
    assert_eq!(result.estimated_value - result.base_value, total as i64);
}

#[tokio::test]
async fn valuation_is_deterministic_for_fixed_inputs() {
    let service = service_with(f150_market());
    let first = service
        .valuate_at(f150_request(), as_of())
        .await
        .expect("succeeds");
    let second = service
        .valuate_at(f150_request(), as_of())
        .await
        .expect("succeeds");
    assert_eq!(first, second);
}

#[tokio::test]
async fn exact_vin_match_raises_confidence() {
    let service = service_with(f150_market());

    let without_vin = service
        .valuate_at(f150_request(), as_of())
        .await
        .expect("succeeds");

    let mut request = f150_request();
    request.vin = Some("1FTFW1E52MFA10001".to_string());
    let with_vin = service.valuate_at(request, as_of()).await.expect("succeeds");

    assert!(with_vin.meta.exact_vin_match);
    assert!(!without_vin.meta.exact_vin_match);
    assert!(with_vin.confidence_score > without_vin.confidence_score);
}

struct FailingProvider;

#[async_trait]
impl ListingProvider for FailingProvider {
    fn name(&self) -> &str {
        "flaky_source"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<Vec<RawListing>, ProviderError> {
        Err(ProviderError::Unavailable {
            name: "flaky_source".to_string(),
            detail: "connection refused".to_string(),
        })
    }
}

struct SlowProvider;

#[async_trait]
impl ListingProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow_source"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<Vec<RawListing>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn source_failures_degrade_to_fallback_with_warnings() {
    let service = ValuationService::new(
        vec![Arc::new(FailingProvider)],
        Arc::new(StaticFuelPrices),
        Duration::from_secs(1),
    );

    let result = service
        .valuate_at(ValuationRequest::new(2019, "Honda", "CR-V"), as_of())
        .await
        .expect("degrades instead of failing");

    assert!(result.meta.fallback_used);
    assert_eq!(result.valuation_method, "msrp_depreciation_fallback");
    assert!(result.estimated_value > 0);
    assert!(result.confidence_score <= 60);
    assert!(result.confidence_score >= 25);
    assert!(result
        .meta
        .warnings
        .iter()
        .any(|w| w.contains("flaky_source")));
}

#[tokio::test]
async fn slow_sources_are_timed_out_not_awaited() {
    let service = ValuationService::new(
        vec![Arc::new(SlowProvider)],
        Arc::new(StaticFuelPrices),
        Duration::from_millis(50),
    );

    let result = service
        .valuate_at(ValuationRequest::new(2019, "Honda", "CR-V"), as_of())
        .await
        .expect("times out the source, not the run");

    assert!(result.meta.fallback_used);
    assert!(result
        .meta
        .warnings
        .iter()
        .any(|w| w.contains("slow_source")));
}

#[tokio::test]
async fn malformed_records_never_panic_the_run() {
    let provider = StaticListingProvider::new(
        "garbage",
        vec![
            json!("not an object"),
            json!(null),
            json!(42),
            json!({ "price": "banana", "year": "also banana" }),
            json!({ "mileage": -5, "price": f64::NAN.to_string() }),
        ],
    );
    let service = service_with(provider);

    let result = service
        .valuate_at(ValuationRequest::new(2020, "Toyota", "Camry"), as_of())
        .await
        .expect("malformed data degrades gracefully");
    assert!(result.meta.fallback_used);
    assert!(result.estimated_value > 0);
}

#[tokio::test]
async fn feature_bonus_is_capped() {
    let service = service_with(f150_market());
    let mut request = f150_request();
    request.features = vec![
        "leather".to_string(),
        "towing".to_string(),
        "awd".to_string(),
        "sunroof".to_string(),
        "moonroof".to_string(),
        "third row".to_string(),
        "heated seats".to_string(),
        "adaptive cruise".to_string(),
        "navigation".to_string(),
        "premium audio".to_string(),
    ];

    let result = service.valuate_at(request, as_of()).await.expect("succeeds");
    let features = result
        .adjustments
        .iter()
        .find(|a| a.factor == "Premium features")
        .expect("feature adjustment present");
    // Catalog sum exceeds the cap; bonus stops at 15% of the $45,000 base.
    assert_eq!(features.impact, 6_750.0);
    assert!(features.description.contains("capped"));
}

struct RegionalFuel(f64);

#[async_trait]
impl FuelPriceProvider for RegionalFuel {
    async fn price(&self, _zip: Option<&str>, _fuel: FuelType) -> Option<FuelPrice> {
        Some(FuelPrice {
            cost_per_unit: self.0,
            source: "test".to_string(),
            state_code: None,
        })
    }
}

#[tokio::test]
async fn electric_bonus_scales_with_regional_fuel_price() {
    let expensive = ValuationService::new(
        vec![Arc::new(f150_market())],
        Arc::new(RegionalFuel(4.65)),
        Duration::from_secs(5),
    );
    let cheap = ValuationService::new(
        vec![Arc::new(f150_market())],
        Arc::new(RegionalFuel(2.95)),
        Duration::from_secs(5),
    );

    let mut request = f150_request();
    request.fuel_type = Some(FuelType::Electric);

    let high = expensive
        .valuate_at(request.clone(), as_of())
        .await
        .expect("succeeds");
    let low = cheap.valuate_at(request, as_of()).await.expect("succeeds");

    let impact = |result: &autoval::valuation::ValuationResult| {
        result
            .adjustments
            .iter()
            .find(|a| a.factor == "Fuel type")
            .expect("fuel adjustment present")
            .impact
    };
    assert!(impact(&high) > impact(&low));
}

#[tokio::test]
async fn router_returns_valuation_json() {
    // The HTTP path valuates against the current clock, so the fixture's
    // listing dates are pinned to today.
    let service = Arc::new(service_with(f150_market_at(Utc::now().date_naive())));
    let app = valuation_router(service);

    let body = json!({
        "year": 2021,
        "make": "Ford",
        "model": "F-150",
        "mileage": 84_000,
        "zip_code": "95821"
    });
    let response = app
        .oneshot(
            Request::post("/api/v1/valuations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let payload: Value = serde_json::from_slice(&bytes).expect("valid json");
    assert!(payload["estimated_value"].as_i64().expect("estimate") > 0);
    assert!(payload["valuation_method"]
        .as_str()
        .expect("method")
        .starts_with("market_median"));
    assert_eq!(payload["adjustments"].as_array().expect("adjustments").len(), 7);
}

#[tokio::test]
async fn router_rejects_blank_identity_with_422() {
    let service = Arc::new(service_with(f150_market_at(Utc::now().date_naive())));
    let app = valuation_router(service);

    let body = json!({ "year": 2021, "make": "", "model": "F-150" });
    let response = app
        .oneshot(
            Request::post("/api/v1/valuations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
