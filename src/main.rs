use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Utc};
use autoval::config::AppConfig;
use autoval::error::AppError;
use autoval::telemetry;
use autoval::valuation::{
    valuation_router, Condition, FuelType, StaticFuelPrices, StaticListingProvider,
    ValuationRequest, ValuationResult, ValuationService,
};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "autoval",
    about = "Used-vehicle valuation aggregation and confidence engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a one-shot valuation against the built-in sample market
    Valuate(ValuateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ValuateArgs {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    make: String,
    #[arg(long)]
    model: String,
    #[arg(long)]
    trim: Option<String>,
    #[arg(long)]
    vin: Option<String>,
    #[arg(long)]
    mileage: Option<f64>,
    /// excellent | very-good | good | fair | poor
    #[arg(long, value_parser = parse_condition)]
    condition: Option<Condition>,
    #[arg(long)]
    zip: Option<String>,
    /// gasoline | premium | diesel | hybrid | electric
    #[arg(long, value_parser = parse_fuel)]
    fuel: Option<FuelType>,
    #[arg(long)]
    accidents: Option<u8>,
    /// Repeatable, e.g. --feature "leather seats" --feature sunroof
    #[arg(long = "feature")]
    features: Vec<String>,
}

fn parse_condition(raw: &str) -> Result<Condition, String> {
    Condition::parse(raw).ok_or_else(|| {
        format!("'{raw}' is not a condition (expected excellent, very-good, good, fair, or poor)")
    })
}

fn parse_fuel(raw: &str) -> Result<FuelType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "gas" | "gasoline" => Ok(FuelType::Gasoline),
        "premium" => Ok(FuelType::Premium),
        "diesel" => Ok(FuelType::Diesel),
        "hybrid" => Ok(FuelType::Hybrid),
        "ev" | "electric" => Ok(FuelType::Electric),
        _ => Err(format!("'{raw}' is not a recognized fuel type")),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Valuate(args) => run_valuate(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let service = Arc::new(ValuationService::new(
        vec![Arc::new(sample_market_provider())],
        Arc::new(StaticFuelPrices),
        config.engine.source_timeout(),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = ops_router(state)
        .merge(valuation_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "valuation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_valuate(args: ValuateArgs) -> Result<(), AppError> {
    let service = ValuationService::new(
        vec![Arc::new(sample_market_provider())],
        Arc::new(StaticFuelPrices),
        std::time::Duration::from_secs(5),
    );

    let mut request = ValuationRequest::new(args.year, args.make, args.model);
    request.trim = args.trim;
    request.vin = args.vin;
    request.mileage = args.mileage;
    request.condition = args.condition;
    request.zip_code = args.zip;
    request.fuel_type = args.fuel;
    request.accidents = args.accidents;
    request.features = args.features;

    let result = service.valuate(request).await?;
    render_result(&result);
    Ok(())
}

fn render_result(result: &ValuationResult) {
    println!("Estimated value: ${}", result.estimated_value);
    println!(
        "Price range:     ${} - ${}",
        result.price_range.0, result.price_range.1
    );
    println!("Confidence:      {}%", result.confidence_score);
    println!("Method:          {}", result.valuation_method);
    println!();
    println!("Adjustments (applied to ${} base):", result.base_value);
    for adjustment in &result.adjustments {
        println!(
            "  {:<18} {:>8}  {}",
            adjustment.factor,
            format!("{:+}", adjustment.impact as i64),
            adjustment.description
        );
    }
    if !result.market_listings.is_empty() {
        println!();
        println!("Comparables ({}):", result.market_listings.len());
        for comp in &result.market_listings {
            println!(
                "  ${:<8} {:>8} mi  {} (quality {})",
                comp.price as i64,
                comp.mileage.map(|m| m as i64).unwrap_or(0),
                comp.source,
                comp.quality_score
            );
        }
    }
    if !result.excluded_listings.is_empty() {
        println!();
        println!("Excluded ({}):", result.excluded_listings.len());
        for excluded in &result.excluded_listings {
            println!("  {} -> {}", excluded.source, excluded.reason);
        }
    }
    if !result.meta.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &result.meta.warnings {
            println!("  {warning}");
        }
    }
}

/// Health, readiness, and metrics endpoints served alongside the valuation
/// routes.
fn ops_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Demo market used by the `valuate` subcommand and the default server wiring
/// until real source integrations are configured.
fn sample_market_provider() -> StaticListingProvider {
    // Listing dates trail the current date so the demo market never falls
    // out of the staleness window.
    let today = Utc::now().date_naive();
    let listed = |days_ago: i64| (today - Duration::days(days_ago)).to_string();
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
