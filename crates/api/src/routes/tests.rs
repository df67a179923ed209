//! Route tests over the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use coffer_core::WalletEngine;
use coffer_core::store::MemoryWalletStore;
use coffer_shared::config::WalletConfig;
use coffer_shared::types::OwnerId;
use http_body_util::BodyExt;
use rstest::rstest;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{AppState, create_router};

fn app() -> Router {
    let engine = WalletEngine::new(Arc::new(MemoryWalletStore::new()), WalletConfig::default());
    create_router(AppState {
        engine: Arc::new(engine),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn bank_json(owner: OwnerId) -> Value {
    json!({
        "owner_id": owner,
        "bank_name": "Vietcombank",
        "bank_account_number": "0011004455667",
        "bank_account_name": "NGUYEN VAN A"
    })
}

async fn funded_owner(app: &Router, amount: u64) -> OwnerId {
    let owner = OwnerId::new();
    let (status, _) = send(app, "POST", "/api/v1/wallets", Some(bank_json(owner))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        app,
        "POST",
        "/api/v1/settlements/order-payments",
        Some(json!({ "owner_id": owner, "amount": amount, "reference_code": "ord-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    owner
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["min_withdrawal"], 50_000);
}

#[tokio::test]
async fn test_create_and_get_wallet() {
    let app = app();
    let owner = OwnerId::new();

    let (status, body) = send(&app, "POST", "/api/v1/wallets", Some(bank_json(owner))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wallet"]["balance"], 0);
    assert_eq!(body["pending_unlinked_credits"], 0);

    let (status, body) = send(&app, "POST", "/api/v1/wallets", Some(bank_json(owner))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "WALLET_ALREADY_EXISTS");

    let (status, body) = send(&app, "GET", &format!("/api/v1/wallets/{owner}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], owner.to_string());
}

#[tokio::test]
async fn test_missing_bank_info_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/wallets",
        Some(json!({ "owner_id": OwnerId::new(), "bank_name": "Vietcombank" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_BANK_INFO");
}

#[tokio::test]
async fn test_unknown_wallet_is_not_found() {
    let app = app();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/wallets/{}", OwnerId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "WALLET_NOT_FOUND");
}

#[tokio::test]
async fn test_settlement_redelivery_returns_ok() {
    let app = app();
    let owner = funded_owner(&app, 100_000).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/settlements/order-payments",
        Some(json!({ "owner_id": owner, "amount": 100_000, "reference_code": "ord-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "already_applied");

    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{owner}"), None).await;
    assert_eq!(wallet["balance"], 100_000);
}

#[tokio::test]
async fn test_reserved_reference_is_rejected() {
    let app = app();
    let owner = funded_owner(&app, 100_000).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/settlements/adjustments",
        Some(json!({ "owner_id": owner, "amount": 1_000, "reference_code": "WDR-forged" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REFERENCE");
}

#[tokio::test]
async fn test_credit_without_wallet_is_parked_then_linked() {
    let app = app();
    let owner = OwnerId::new();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/settlements/order-payments",
        Some(json!({ "owner_id": owner, "amount": 70_000, "reference_code": "ord-9" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"], "unlinked");
    let credit_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, created) = send(&app, "POST", "/api/v1/wallets", Some(bank_json(owner))).await;
    assert_eq!(created["pending_unlinked_credits"], 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/unlinked-credits/{credit_id}/link"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "applied");

    let (_, register) = send(
        &app,
        "GET",
        &format!("/api/v1/wallets/{owner}/unlinked-credits"),
        None,
    )
    .await;
    assert_eq!(register["pending"], 0);

    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{owner}"), None).await;
    assert_eq!(wallet["balance"], 70_000);
}

#[tokio::test]
async fn test_withdrawal_flow_over_http() {
    let app = app();
    let owner = funded_owner(&app, 200_000).await;

    let (status, request) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{owner}/withdrawals"),
        Some(json!({ "amount": 80_000, "note": "weekly" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "PENDING");
    let id = request["id"].as_str().unwrap().to_string();

    let (status, queue) = send(&app, "GET", "/api/v1/withdrawals?status=PENDING", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{id}/approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, done) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{id}/complete"),
        Some(json!({ "admin_note": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["admin_note"], "paid");

    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{owner}"), None).await;
    assert_eq!(wallet["balance"], 120_000);
    assert_eq!(wallet["total_withdrawn"], 80_000);

    let (_, audit) = send(&app, "GET", &format!("/api/v1/wallets/{owner}/audit"), None).await;
    assert_eq!(audit["consistent"], true);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{id}/reject"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[rstest]
#[case(10_000, StatusCode::UNPROCESSABLE_ENTITY, "BELOW_MINIMUM_WITHDRAWAL")]
#[case(500_000, StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_BALANCE")]
#[tokio::test]
async fn test_withdrawal_rejections(
    #[case] amount: u64,
    #[case] expected: StatusCode,
    #[case] code: &str,
) {
    let app = app();
    let owner = funded_owner(&app, 100_000).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{owner}/withdrawals"),
        Some(json!({ "amount": amount })),
    )
    .await;
    assert_eq!(status, expected);
    assert_eq!(body["error"], code);
}

#[tokio::test]
async fn test_unknown_status_filter_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/withdrawals?status=CANCELLED", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_STATUS");
}

#[tokio::test]
async fn test_reconciliation_flow_over_http() {
    let app = app();
    let shipper = OwnerId::new();
    send(&app, "POST", "/api/v1/wallets", Some(bank_json(shipper))).await;

    let (status, rec) = send(
        &app,
        "POST",
        "/api/v1/reconciliations",
        Some(json!({
            "shipper_id": shipper,
            "date": "2024-03-04",
            "total_collected": 500_000,
            "total_deposited": 450_000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rec["difference"], -50_000);
    let id = rec["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/reconciliations",
        Some(json!({
            "shipper_id": shipper,
            "date": "2024-03-04",
            "total_collected": 1,
            "total_deposited": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, rec) = send(
        &app,
        "POST",
        &format!("/api/v1/reconciliations/{id}/advance"),
        None,
    )
    .await;
    assert_eq!(rec["status"], "PROCESSING");
    let (_, rec) = send(
        &app,
        "POST",
        &format!("/api/v1/reconciliations/{id}/advance"),
        None,
    )
    .await;
    assert_eq!(rec["status"], "DONE");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/reconciliations/{id}/totals"),
        Some(json!({ "total_collected": 1, "total_deposited": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "RECONCILIATION_SETTLED");

    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{shipper}"), None).await;
    assert_eq!(wallet["balance"], 450_000);

    let (_, day) = send(&app, "GET", "/api/v1/reconciliations?date=2024-03-04", None).await;
    assert_eq!(day.as_array().unwrap().len(), 1);

    let (_, page) = send(
        &app,
        "GET",
        &format!("/api/v1/shippers/{shipper}/reconciliations"),
        None,
    )
    .await;
    assert_eq!(page["data"].as_array().unwrap().len(), 1);

    let (status, correction) = send(
        &app,
        "POST",
        &format!("/api/v1/reconciliations/{id}/corrections"),
        Some(json!({ "total_collected": 500_000, "total_deposited": 500_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(correction["corrects"], id.as_str());
    assert_eq!(correction["status"], "PENDING");
    let correction_id = correction["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/reconciliations/{id}/corrections"),
        Some(json!({ "total_collected": 500_000, "total_deposited": 500_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "RECONCILIATION_ALREADY_CORRECTED");

    for _ in 0..2 {
        send(
            &app,
            "POST",
            &format!("/api/v1/reconciliations/{correction_id}/advance"),
            None,
        )
        .await;
    }
    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{shipper}"), None).await;
    assert_eq!(wallet["balance"], 500_000);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/reconciliations/{correction_id}/corrections"),
        Some(json!({ "total_collected": 500_000, "total_deposited": 490_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "DEPOSIT_REDUCTION");
}

#[tokio::test]
async fn test_balance_history_over_http() {
    let app = app();
    let shipper = OwnerId::new();
    let uri = format!("/api/v1/shippers/{shipper}/balance-history");

    let (status, row) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "date": "2024-03-01", "collected": 300_000, "deposited": 250_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(row["final_balance"], 50_000);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "date": "2024-02-28", "collected": 0, "deposited": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BALANCE_HISTORY_OUT_OF_ORDER");

    let (_, rows) = send(&app, "GET", &format!("{uri}?from=2024-03-01"), None).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
}
