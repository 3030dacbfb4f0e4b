//! Balance correction handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use app_services::Actor;
use core_kernel::{CompanyId, CorrectionId};

use crate::dto::common::{non_blank, CountResponse};
use crate::dto::correction::*;
use crate::dto::refund::RejectRequest;
use crate::{error::ApiError, AppState};

/// Files a correction against a company's charged amounts
pub async fn create_correction(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<CreateCorrectionRequest>,
) -> Result<(StatusCode, Json<CorrectionResponse>), ApiError> {
    request.validate()?;
    let (lines, comment) = request.into_parts();
    let correction = state
        .services
        .corrections
        .create(&actor, CompanyId::from_uuid(company_id), lines, comment)
        .await?;
    Ok((StatusCode::CREATED, Json(correction.into())))
}

pub async fn list_corrections(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<CorrectionListQuery>,
) -> Result<Json<Vec<CorrectionResponse>>, ApiError> {
    let corrections = state.services.corrections.list(&actor, &query.into_query()?).await?;
    Ok(Json(corrections.into_iter().map(CorrectionResponse::from).collect()))
}

pub async fn get_correction(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CorrectionResponse>, ApiError> {
    let correction = state.services.corrections.get(&actor, CorrectionId::from_uuid(id)).await?;
    Ok(Json(correction.into()))
}

/// Approves and posts one correction line per non-zero delta
pub async fn approve_correction(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CorrectionResponse>, ApiError> {
    let correction = state.services.corrections.approve(&actor, CorrectionId::from_uuid(id)).await?;
    Ok(Json(correction.into()))
}

pub async fn reject_correction(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<CorrectionResponse>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;
    let correction = state
        .services
        .corrections
        .reject(&actor, CorrectionId::from_uuid(id), non_blank(request.reason))
        .await?;
    Ok(Json(correction.into()))
}

pub async fn pending_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services.corrections.pending_count(&actor).await?;
    Ok(Json(CountResponse { count }))
}
