//! HTTP surface for the valuation engine.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::error::AppError;

use super::domain::{ValuationRequest, ValuationResult};
use super::service::ValuationService;

/// Routes owned by the valuation engine, mounted by the server alongside the
/// operational endpoints.
pub fn valuation_router(service: Arc<ValuationService>) -> Router {
    Router::new()
        .route("/api/v1/valuations", post(valuate_endpoint))
        .with_state(service)
}

async fn valuate_endpoint(
    State(service): State<Arc<ValuationService>>,
    Json(request): Json<ValuationRequest>,
) -> Result<Json<ValuationResult>, AppError> {
    let result = service.valuate(request).await?;
    Ok(Json(result))
}
