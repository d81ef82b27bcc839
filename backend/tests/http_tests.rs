//! HTTP routing tests
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: token checks,
//! role errors rendered as JSON, and the cron-guarded alert scan.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use common::*;
use consignment_ledger::config::PricingBasis;
use consignment_ledger::middleware::auth::issue_token;
use consignment_ledger::services::partner::CreateStoreInput;
use consignment_ledger::services::reconciliation::{
    CountEntry, RecordPaymentInput, SubmitCountInput,
};
use consignment_ledger::services::{PartnerService, ReconciliationService};
use consignment_ledger::{create_app, AppState};
use serde_json::{json, Value};
use shared::Actor;
use tower::ServiceExt;

async fn app() -> (Router, Warehouse) {
    let w = Warehouse::new().await;
    let state = AppState::new(w.store.clone(), test_config(PricingBasis::Current));
    (create_app(state), w)
}

fn bearer(actor: &Actor) -> String {
    let token = issue_token(actor, JWT_SECRET, Duration::hours(1)).unwrap();
    format!("Bearer {}", token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _w) = app().await;

    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _w) = app().await;

    let response = app
        .oneshot(Request::get("/api/v1/inventory").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

async fn get(app: Router, uri: &str, actor: &Actor) -> axum::response::Response {
    app.oneshot(
        Request::get(uri)
            .header(header::AUTHORIZATION, bearer(actor))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_staff_reads_inventory() {
    let (app, w) = app().await;
    w.receive(7).await;

    let response = get(app.clone(), "/api/v1/inventory", &staff()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["on_hand"], 7);
    assert_eq!(body[0]["location_name"], "Back room");

    // Warehouse-wide figures are not for store partners
    let response = get(app, "/api/v1/inventory", &partner(w.store_id)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_partner_reads_only_its_own_store() {
    let (app, w) = app().await;
    let other = PartnerService::new(w.store.clone())
        .create_store(
            &manager(),
            CreateStoreInput {
                name: "Hilltop Deli".to_string(),
                contact_name: None,
                contact_phone: None,
                address: None,
            },
        )
        .await
        .unwrap();
    let partner = partner(w.store_id);

    let own = format!("/api/v1/stores/{}/balance", w.store_id);
    let response = get(app.clone(), &own, &partner).await;
    assert_eq!(response.status(), StatusCode::OK);

    let foreign = format!("/api/v1/stores/{}/balance", other.store.id);
    let response = get(app.clone(), &foreign, &partner).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");

    let sheet = format!("/api/v1/stores/{}/count-sheet", other.store.id);
    let response = get(app.clone(), &sheet, &partner).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Store listing is narrowed rather than refused
    let response = get(app, "/api/v1/stores", &partner).await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Corner Market");
}

#[tokio::test]
async fn test_partner_movement_history_is_pinned_to_its_store() {
    let (app, w) = app().await;
    w.receive(10).await;
    w.deliver(4, at(2024, 1, 1)).await;
    let partner = partner(w.store_id);

    let response = get(app.clone(), "/api/v1/movements", &partner).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["action"], "DELIVER_TO_STORE");

    let uri = format!("/api/v1/movements?store_id={}", uuid::Uuid::new_v4());
    let response = get(app.clone(), &uri, &partner).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A viewer with no store assigned sees nothing
    let response = get(app, "/api/v1/movements", &viewer()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_store_history_routes() {
    let (app, w) = app().await;
    w.receive(10).await;
    w.deliver(6, at(2024, 1, 1)).await;
    let reconciliation = ReconciliationService::new(w.store.clone(), PricingBasis::Current);
    reconciliation
        .submit_store_count(
            &staff(),
            w.store_id,
            SubmitCountInput {
                count_date: date(2024, 1, 8),
                entries: vec![CountEntry {
                    product_id: w.product_id,
                    boxes_remaining: 2,
                }],
            },
        )
        .await
        .unwrap();
    reconciliation
        .record_payment(
            &staff(),
            w.store_id,
            RecordPaymentInput {
                amount: dec("50.00"),
                payment_date: date(2024, 1, 9),
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let partner = partner(w.store_id);

    let uri = format!("/api/v1/stores/{}/counts", w.store_id);
    let body = body_json(get(app.clone(), &uri, &partner).await).await;
    assert_eq!(body[0]["boxes_remaining"], 2);

    let uri = format!("/api/v1/stores/{}/payments", w.store_id);
    let body = body_json(get(app.clone(), &uri, &partner).await).await;
    assert_eq!(body[0]["amount"], "50.00");

    let response = get(app.clone(), "/api/v1/stores/balances", &staff()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stores"][0]["store_name"], "Corner Market");
    assert_eq!(body["stores"][0]["balance"], "70.00");
    assert_eq!(body["totals"]["total_owed"], "120.00");

    let response = get(app, "/api/v1/stores/balances", &partner).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_viewer_cannot_post_movements() {
    let (app, w) = app().await;

    let payload = json!({
        "action": "RECEIVE",
        "product_id": w.product_id,
        "unit_type": "BOX",
        "quantity": 3,
        "to_location_id": w.storage.id,
        "vendor_id": w.vendor_id,
        "cost_per_box": "20.00",
    });
    let response = app
        .oneshot(
            Request::post("/api/v1/movements")
                .header(header::AUTHORIZATION, bearer(&viewer()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(w.memory.movement_count().await, 0);
}

#[tokio::test]
async fn test_staff_posts_movement() {
    let (app, w) = app().await;

    let payload = json!({
        "action": "RECEIVE",
        "product_id": w.product_id,
        "unit_type": "BOX",
        "quantity": 3,
        "to_location_id": w.storage.id,
        "vendor_id": w.vendor_id,
        "cost_per_box": "20.00",
    });
    let response = app
        .oneshot(
            Request::post("/api/v1/movements")
                .header(header::AUTHORIZATION, bearer(&staff()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["action"], "RECEIVE");
    assert_eq!(body["performed_by"], "user_staff");
    assert_eq!(w.memory.movement_count().await, 1);
}

#[tokio::test]
async fn test_insufficient_stock_is_unprocessable() {
    let (app, w) = app().await;

    let payload = json!({
        "action": "PUT_ON_SHELF",
        "product_id": w.product_id,
        "unit_type": "BOX",
        "quantity": 1,
        "from_location_id": w.storage.id,
        "to_location_id": w.shelf.id,
    });
    let response = app
        .oneshot(
            Request::post("/api/v1/movements")
                .header(header::AUTHORIZATION, bearer(&staff()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
}

#[tokio::test]
async fn test_unknown_store_balance_is_not_found() {
    let (app, _w) = app().await;

    let uri = format!("/api/v1/stores/{}/balance", uuid::Uuid::new_v4());
    let response = app
        .oneshot(
            Request::get(uri)
                .header(header::AUTHORIZATION, bearer(&staff()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cron_requires_its_own_secret() {
    let (app, w) = app().await;
    w.receive(2).await;

    // A user token is not the cron secret
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/cron/alerts")
                .header(header::AUTHORIZATION, bearer(&manager()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::post("/api/v1/cron/alerts")
                .header(header::AUTHORIZATION, format!("Bearer {}", CRON_SECRET))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["alerts_created"]["low_stock"], 1);
}
