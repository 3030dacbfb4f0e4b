//! Unauthenticated fee estimator

use axum::{extract::State, Json};
use validator::Validate;

use crate::dto::public::*;
use crate::{error::ApiError, AppState};

/// Prices items against the configured rate table without storing anything
pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    request.validate()?;
    EstimateResponse::estimate(&state.rates, &request).map(Json)
}

pub async fn rates(State(state): State<AppState>) -> Json<RatesResponse> {
    Json(RatesResponse::from(state.rates.as_ref()))
}
