//! HTTP API Layer
//!
//! This crate exposes the fee ledger and its review workflows over REST
//! using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each resource
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: camelCase request/response bodies
//! - **Error Handling**: Consistent `{error, message}` responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(services, rates, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use app_services::FeeServices;
use domain_calculation::RateCatalog;

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{accounts, calculations, corrections, health, public, refunds};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: FeeServices,
    /// Rate table for the public estimator
    pub rates: Arc<RateCatalog>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(services: FeeServices, rates: RateCatalog, config: ApiConfig) -> Self {
        Self {
            services,
            rates: Arc::new(rates),
            config,
        }
    }
}

/// Creates the main API router
///
/// Everything under `/api/v1` except `/api/v1/public` requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/v1/public/calculate", post(public::calculate))
        .route("/api/v1/public/rates", get(public::rates));

    let account_routes = Router::new()
        .route("/", get(accounts::list_accounts).post(accounts::open_account))
        .route("/summary", get(accounts::summary))
        .route("/corrections", get(corrections::list_corrections))
        .route("/corrections/pending-count", get(corrections::pending_count))
        .route("/corrections/:id", get(corrections::get_correction))
        .route("/corrections/:id/approve", post(corrections::approve_correction))
        .route("/corrections/:id/reject", post(corrections::reject_correction))
        .route("/:company_id", get(accounts::get_account))
        .route("/:company_id/transactions", get(accounts::transactions))
        .route("/:company_id/charge", post(accounts::charge))
        .route("/:company_id/payment", post(accounts::payment))
        .route("/:company_id/offset", post(accounts::offset))
        .route("/:company_id/refund", post(accounts::refund))
        .route("/:company_id/penalty", post(accounts::penalty))
        .route("/:company_id/corrections", post(corrections::create_correction))
        .route(
            "/:company_id/reconciliation/:calculation_id",
            get(accounts::reconciliation),
        )
        .route("/:company_id/verify", post(accounts::verify));

    let calculation_routes = Router::new()
        .route(
            "/",
            get(calculations::list_calculations).post(calculations::create_calculation),
        )
        .route("/pending-count", get(calculations::pending_count))
        .route("/review-count", get(calculations::review_count))
        .route(
            "/:id",
            get(calculations::get_calculation)
                .put(calculations::update_calculation)
                .delete(calculations::delete_calculation),
        )
        .route("/:id/items", put(calculations::update_items))
        .route("/:id/submit", post(calculations::submit))
        .route("/:id/resubmit", post(calculations::resubmit))
        .route("/:id/review", post(calculations::take_into_review))
        .route("/:id/approve", post(calculations::approve))
        .route("/:id/reject", post(calculations::reject))
        .route("/:id/copy", post(calculations::copy))
        .route("/:id/payment", post(calculations::submit_payment))
        .route("/:id/payment/approve", post(calculations::approve_payment))
        .route("/:id/payment/reject", post(calculations::reject_payment))
        .route("/:id/mark-paid", post(calculations::mark_paid));

    let refund_routes = Router::new()
        .route("/", get(refunds::list_refunds).post(refunds::create_refund))
        .route("/pending-count", get(refunds::pending_count))
        .route("/:id", get(refunds::get_refund))
        .route("/:id/approve", post(refunds::approve_refund))
        .route("/:id/reject", post(refunds::reject_refund));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/calculations", calculation_routes)
        .nest("/refunds", refund_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
