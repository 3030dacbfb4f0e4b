//! Router tests against the in-memory store
//!
//! Each test builds a fresh application and drives it through
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use app_services::{FeeServices, InMemoryFeeStore, Notifier};
use domain_calculation::{RateCatalog, RateEntry};
use interface_api::{auth::create_token, config::ApiConfig, create_router, AppState};
use rust_decimal_macros::dec;

const SECRET: &str = "router-test-secret";

fn app() -> Router {
    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    };
    let rates = RateCatalog::from_entries([RateEntry {
        product_group: "plastic".to_string(),
        rate: dec!(500),
        recycling_norm: dec!(20),
    }]);
    let services = FeeServices::new(Arc::new(InMemoryFeeStore::new()), Notifier::tracing());
    create_router(AppState::new(services, rates, config))
}

fn token(role: &str, company: Option<Uuid>) -> String {
    create_token("user-1", vec![role.to_string()], company, SECRET, 600).unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_account(app: &Router, admin: &str, company: Uuid) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/accounts",
        Some(admin),
        Some(json!({"companyId": company, "companyName": "Acme LLP", "taxNumber": "123456789012"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

mod public_routes {
    use super::*;

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_estimator_prices_items() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/public/calculate",
            None,
            Some(json!({"items": [{"productGroup": "plastic", "weight": "1000"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalAmount"], "400.00");
        assert_eq!(body["items"][0]["recyclingNorm"], "20");
    }

    #[tokio::test]
    async fn test_estimator_rejects_oversized_weight() {
        let app = app();
        let item = json!({"productGroup": "plastic", "weight": "70000000000000000000000000000"});
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/public/calculate",
            None,
            Some(json!({"items": [item.clone(), item.clone(), item.clone(), item]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_estimator_rejects_empty_items() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/api/v1/public/calculate", None, Some(json!({"items": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/api/v1/accounts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_without_known_role_is_forbidden() {
        let app = app();
        let token = token("guest", None);
        let (status, _) = send(&app, Method::GET, "/api/v1/accounts", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_payer_cannot_list_accounts() {
        let app = app();
        let token = token("business", Some(Uuid::new_v4()));
        let (status, body) = send(&app, Method::GET, "/api/v1/accounts", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }
}

mod workflows {
    use super::*;

    #[tokio::test]
    async fn test_calculation_is_charged_and_paid() {
        let app = app();
        let company = Uuid::new_v4();
        let admin = token("admin", None);
        let payer = token("business", Some(company));
        open_account(&app, &admin, company).await;

        let (status, calc) = send(
            &app,
            Method::POST,
            "/api/v1/calculations",
            Some(&payer),
            Some(json!({
                "period": "2026-Q1",
                "items": [{"productGroup": "plastic", "weight": "1000", "rate": "500", "recyclingNorm": "20"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(calc["status"], "draft");
        assert_eq!(calc["totalAmount"], "400.00");
        assert!(calc["number"].as_str().unwrap().starts_with("CALC-"));
        let id = calc["id"].as_str().unwrap().to_string();

        let (_, calc) = send(&app, Method::POST, &format!("/api/v1/calculations/{id}/submit"), Some(&payer), None).await;
        assert_eq!(calc["status"], "submitted");

        let (_, calc) = send(&app, Method::POST, &format!("/api/v1/calculations/{id}/review"), Some(&admin), None).await;
        assert_eq!(calc["status"], "under_review");

        let (status, calc) = send(
            &app,
            Method::POST,
            &format!("/api/v1/calculations/{id}/approve"),
            Some(&admin),
            Some(json!({"comment": "ok"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calc["status"], "approved");

        let (_, account) = send(&app, Method::GET, &format!("/api/v1/accounts/{company}"), Some(&payer), None).await;
        assert_eq!(account["balance"], "-400.00");
        assert_eq!(account["totalCharged"], "400.00");

        let (status, calc) = send(
            &app,
            Method::POST,
            &format!("/api/v1/calculations/{id}/payment"),
            Some(&payer),
            Some(json!({"amount": "400", "paymentDate": "2026-04-15", "documentNumber": "PP-17"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calc["payments"][0]["status"], "pending");

        let (_, calc) = send(
            &app,
            Method::POST,
            &format!("/api/v1/calculations/{id}/payment/approve"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(calc["status"], "paid");
        assert_eq!(calc["paidAmount"], "400.00");

        let (_, recon) = send(
            &app,
            Method::GET,
            &format!("/api/v1/accounts/{company}/reconciliation/{id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(recon["charged"], "400.00");
        assert_eq!(recon["paid"], "400.00");
        assert_eq!(recon["settled"], true);

        let (_, history) = send(
            &app,
            Method::GET,
            &format!("/api/v1/accounts/{company}/transactions"),
            Some(&admin),
            None,
        )
        .await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["type"], "charge");
        assert_eq!(history[1]["balanceAfter"], "0.00");

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/accounts/{company}/verify"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reject_without_comment_is_business_rule_violation() {
        let app = app();
        let company = Uuid::new_v4();
        let admin = token("employee", None);
        let payer = token("business", Some(company));
        open_account(&app, &token("admin", None), company).await;

        let (_, calc) = send(
            &app,
            Method::POST,
            "/api/v1/calculations",
            Some(&payer),
            Some(json!({"period": "2026-Q2", "items": [{"productGroup": "glass", "weight": "10", "rate": "100"}]})),
        )
        .await;
        let id = calc["id"].as_str().unwrap().to_string();
        send(&app, Method::POST, &format!("/api/v1/calculations/{id}/submit"), Some(&payer), None).await;

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/calculations/{id}/reject"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "business_rule_violation");

        let (_, count) = send(&app, Method::GET, "/api/v1/calculations/review-count", Some(&admin), None).await;
        assert_eq!(count["count"], 1);
    }

    #[tokio::test]
    async fn test_penalty_requires_admin() {
        let app = app();
        let company = Uuid::new_v4();
        open_account(&app, &token("admin", None), company).await;

        let body = json!({"amount": "50", "reason": "late filing"});
        let uri = format!("/api/v1/accounts/{company}/penalty");

        let (status, _) = send(&app, Method::POST, &uri, Some(&token("eco_operator", None)), Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, tx) = send(&app, Method::POST, &uri, Some(&token("admin", None)), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tx["type"], "penalty");
        assert_eq!(tx["balanceAfter"], "-50.00");
    }

    #[tokio::test]
    async fn test_oversized_item_is_rejected() {
        let app = app();
        let company = Uuid::new_v4();
        let payer = token("business", Some(company));
        open_account(&app, &token("admin", None), company).await;

        let item = json!({"productGroup": "plastic", "weight": "1000", "rate": "50000000000000000000000000000"});
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/calculations",
            Some(&payer),
            Some(json!({"period": "2026-Q1", "items": [item.clone(), item]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_ledger_posts_return_ok_and_history_filters_by_period() {
        let app = app();
        let company = Uuid::new_v4();
        let admin = token("admin", None);
        open_account(&app, &admin, company).await;

        for date in ["2026-01-15", "2026-03-15"] {
            let (status, tx) = send(
                &app,
                Method::POST,
                &format!("/api/v1/accounts/{company}/payment"),
                Some(&admin),
                Some(json!({"amount": "100", "paymentDate": date})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(tx["type"], "payment");
        }

        let (status, history) = send(
            &app,
            Method::GET,
            &format!("/api/v1/accounts/{company}/transactions?periodFrom=2026-02-01&periodTo=2026-12-31"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["date"], "2026-03-15");
    }

    #[tokio::test]
    async fn test_unknown_calculation_is_not_found() {
        let app = app();
        let admin = token("admin", None);
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/calculations/{}", Uuid::new_v4()),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }
}
