//! Account and ledger handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use app_services::{AccountSummary, Actor};
use core_kernel::{CalculationId, CompanyId, ReportId};

use crate::dto::account::*;
use crate::dto::common::{non_blank, DateRangeQuery, MessageResponse};
use crate::{error::ApiError, AppState};

/// Opens an account for a company
pub async fn open_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    request.validate()?;
    let account = state
        .services
        .ledger
        .open_account(
            &actor,
            CompanyId::from_uuid(request.company_id),
            &request.company_name,
            &request.tax_number,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Lists accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.services.ledger.accounts(&actor, &query.into()).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// Portfolio totals
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<AccountSummary>, ApiError> {
    Ok(Json(state.services.ledger.summary(&actor).await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.services.ledger.account(&actor, CompanyId::from_uuid(company_id)).await?;
    Ok(Json(account.into()))
}

/// Transaction history, optionally bounded by `periodFrom`/`periodTo`
pub async fn transactions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let history = state
        .services
        .ledger
        .history(&actor, CompanyId::from_uuid(company_id), query.range()?)
        .await?;
    Ok(Json(history.into_iter().map(TransactionResponse::from).collect()))
}

pub async fn charge(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    request.validate()?;
    let tx = state
        .services
        .ledger
        .charge(
            &actor,
            CompanyId::from_uuid(company_id),
            request.amount,
            CalculationId::from_uuid(request.calculation_id),
            non_blank(request.description),
        )
        .await?;
    Ok(Json(tx.into()))
}

pub async fn payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    request.validate()?;
    let tx = state
        .services
        .ledger
        .pay(
            &actor,
            CompanyId::from_uuid(company_id),
            request.amount,
            request.payment_date,
            non_blank(request.document_number),
        )
        .await?;
    Ok(Json(tx.into()))
}

pub async fn offset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<OffsetRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    request.validate()?;
    let tx = state
        .services
        .ledger
        .offset(
            &actor,
            CompanyId::from_uuid(company_id),
            request.amount,
            ReportId::from_uuid(request.report_id),
        )
        .await?;
    Ok(Json(tx.into()))
}

/// Disburses money back to the payer
pub async fn refund(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<AmountWithReasonRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    request.validate()?;
    let tx = state
        .services
        .ledger
        .refund_request(&actor, CompanyId::from_uuid(company_id), request.amount, &request.reason)
        .await?;
    Ok(Json(tx.into()))
}

pub async fn penalty(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<AmountWithReasonRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    request.validate()?;
    let tx = state
        .services
        .ledger
        .penalty(&actor, CompanyId::from_uuid(company_id), request.amount, &request.reason)
        .await?;
    Ok(Json(tx.into()))
}

/// Charged, paid and offset totals for one calculation
pub async fn reconciliation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((company_id, calculation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let reconciliation = state
        .services
        .ledger
        .reconcile(
            &actor,
            CompanyId::from_uuid(company_id),
            CalculationId::from_uuid(calculation_id),
        )
        .await?;
    Ok(Json(reconciliation.into()))
}

/// Replays the account log against its stored aggregates
pub async fn verify(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.services.ledger.verify(&actor, CompanyId::from_uuid(company_id)).await?;
    Ok(Json(MessageResponse::ok("Ledger is consistent")))
}
