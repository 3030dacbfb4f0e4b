//! Calculation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use app_services::Actor;
use core_kernel::CalculationId;

use crate::dto::calculation::*;
use crate::dto::common::{non_blank, CountResponse, MessageResponse, PageResponse};
use crate::{error::ApiError, AppState};

type CalculationResult = Result<Json<CalculationResponse>, ApiError>;

/// Lists calculations; payers only ever see their own company
pub async fn list_calculations(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<CalculationListQuery>,
) -> Result<Json<PageResponse<CalculationResponse>>, ApiError> {
    let page = state.services.calculations.list(&actor, query.into_query()?).await?;
    Ok(Json(PageResponse::from_page(page, CalculationResponse::from)))
}

/// Creates a draft calculation
pub async fn create_calculation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CalculationRequest>,
) -> Result<(StatusCode, Json<CalculationResponse>), ApiError> {
    request.validate()?;
    let (header, items) = request.into_parts();
    let calculation = state.services.calculations.create(&actor, header, items).await?;
    Ok((StatusCode::CREATED, Json(calculation.into())))
}

pub async fn get_calculation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state.services.calculations.get(&actor, CalculationId::from_uuid(id)).await?;
    Ok(Json(calculation.into()))
}

/// Replaces header and items
pub async fn update_calculation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<CalculationRequest>,
) -> CalculationResult {
    request.validate()?;
    let (header, items) = request.into_parts();
    let calculation = state
        .services
        .calculations
        .update(&actor, CalculationId::from_uuid(id), header, items)
        .await?;
    Ok(Json(calculation.into()))
}

pub async fn update_items(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateItemsRequest>,
) -> CalculationResult {
    request.validate()?;
    let calculation = state
        .services
        .calculations
        .update_items(&actor, CalculationId::from_uuid(id), request.into_inputs())
        .await?;
    Ok(Json(calculation.into()))
}

pub async fn delete_calculation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.services.calculations.delete(&actor, CalculationId::from_uuid(id)).await?;
    Ok(Json(MessageResponse::ok("Calculation deleted")))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state.services.calculations.submit(&actor, CalculationId::from_uuid(id)).await?;
    Ok(Json(calculation.into()))
}

pub async fn resubmit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state.services.calculations.resubmit(&actor, CalculationId::from_uuid(id)).await?;
    Ok(Json(calculation.into()))
}

pub async fn take_into_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state
        .services
        .calculations
        .take_into_review(&actor, CalculationId::from_uuid(id))
        .await?;
    Ok(Json(calculation.into()))
}

/// Approves and charges the total to the payer's account
pub async fn approve(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<CommentRequest>>,
) -> CalculationResult {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;
    let calculation = state
        .services
        .calculations
        .approve(&actor, CalculationId::from_uuid(id), non_blank(request.comment))
        .await?;
    Ok(Json(calculation.into()))
}

/// Rejects; a non-blank comment is required
pub async fn reject(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<CommentRequest>>,
) -> CalculationResult {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;
    let calculation = state
        .services
        .calculations
        .reject(&actor, CalculationId::from_uuid(id), request.comment.as_deref())
        .await?;
    Ok(Json(calculation.into()))
}

/// Copies into a new draft
pub async fn copy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<CalculationResponse>), ApiError> {
    let calculation = state.services.calculations.copy(&actor, CalculationId::from_uuid(id)).await?;
    Ok((StatusCode::CREATED, Json(calculation.into())))
}

/// Records a payment attempt for review
pub async fn submit_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentSubmissionRequest>,
) -> CalculationResult {
    request.validate()?;
    let calculation = state
        .services
        .calculations
        .submit_payment(&actor, CalculationId::from_uuid(id), request.into_submission()?)
        .await?;
    Ok(Json(calculation.into()))
}

pub async fn approve_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state
        .services
        .calculations
        .approve_payment(&actor, CalculationId::from_uuid(id))
        .await?;
    Ok(Json(calculation.into()))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<CommentRequest>>,
) -> CalculationResult {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;
    let calculation = state
        .services
        .calculations
        .reject_payment(&actor, CalculationId::from_uuid(id), non_blank(request.comment))
        .await?;
    Ok(Json(calculation.into()))
}

/// Forces `paid` without a posting
pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> CalculationResult {
    let calculation = state.services.calculations.mark_paid(&actor, CalculationId::from_uuid(id)).await?;
    Ok(Json(calculation.into()))
}

/// Payer's calculations waiting for a reviewer
pub async fn pending_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services.calculations.pending_count(&actor).await?;
    Ok(Json(CountResponse { count }))
}

/// Calculations awaiting a reviewer
pub async fn review_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services.calculations.review_count(&actor).await?;
    Ok(Json(CountResponse { count }))
}
