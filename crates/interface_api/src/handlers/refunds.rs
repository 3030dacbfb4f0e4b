//! Refund handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use app_services::Actor;
use core_kernel::RefundId;

use crate::dto::common::{non_blank, CountResponse};
use crate::dto::refund::*;
use crate::{error::ApiError, AppState};

/// Files a refund request for the payer's own calculations
pub async fn create_refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateRefundRequest>,
) -> Result<(StatusCode, Json<RefundResponse>), ApiError> {
    request.validate()?;
    let (items, comment) = request.into_parts();
    let refund = state.services.refunds.create(&actor, items, comment).await?;
    Ok((StatusCode::CREATED, Json(refund.into())))
}

pub async fn list_refunds(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<RefundResponse>>, ApiError> {
    let refunds = state.services.refunds.list(&actor, query.status()?).await?;
    Ok(Json(refunds.into_iter().map(RefundResponse::from).collect()))
}

pub async fn get_refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = state.services.refunds.get(&actor, RefundId::from_uuid(id)).await?;
    Ok(Json(refund.into()))
}

/// Approves and credits the total to the payer's account
pub async fn approve_refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = state.services.refunds.approve(&actor, RefundId::from_uuid(id)).await?;
    Ok(Json(refund.into()))
}

pub async fn reject_refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<RefundResponse>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;
    let refund = state
        .services
        .refunds
        .reject(&actor, RefundId::from_uuid(id), non_blank(request.reason))
        .await?;
    Ok(Json(refund.into()))
}

pub async fn pending_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services.refunds.pending_count(&actor).await?;
    Ok(Json(CountResponse { count }))
}
