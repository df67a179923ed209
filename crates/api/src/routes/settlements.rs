//! Settlement routes: credits delivered by the order subsystem and operator corrections.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use coffer_core::ledger::ReferenceCode;
use coffer_core::settlement::SettlementOutcome;
use coffer_shared::types::{Money, OwnerId, UnlinkedCreditId};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the settlement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settlements/order-payments", post(settle_order_payment))
        .route("/settlements/adjustments", post(credit_adjustment))
        .route("/unlinked-credits/{id}/link", post(link_unlinked_credit))
}

/// Request body for a credit.
#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    /// Wallet owner.
    pub owner_id: OwnerId,
    /// Amount in minor units.
    pub amount: Money,
    /// Caller's idempotency key, e.g. the order code.
    pub reference_code: String,
    /// Ledger description.
    #[serde(default)]
    pub description: Option<String>,
}

/// 201 for a new entry, 200 for a redelivery, 202 when the credit is parked in the register.
fn outcome_response(outcome: SettlementOutcome) -> impl IntoResponse {
    let status = match &outcome {
        SettlementOutcome::Applied(_) => StatusCode::CREATED,
        SettlementOutcome::AlreadyApplied(_) => StatusCode::OK,
        SettlementOutcome::Unlinked(_) => StatusCode::ACCEPTED,
    };
    (status, Json(outcome))
}

/// POST `/settlements/order-payments` - Credits a delivered order's payment.
async fn settle_order_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreditRequest>,
) -> ApiResult<impl IntoResponse> {
    let reference_code = ReferenceCode::external(payload.reference_code)?;
    let description = payload
        .description
        .unwrap_or_else(|| format!("Payment for order {reference_code}"));
    let outcome = state
        .engine
        .settle_order_payment(
            payload.owner_id,
            payload.amount,
            reference_code,
            description,
        )
        .await?;
    Ok(outcome_response(outcome))
}

/// POST `/settlements/adjustments` - Operator credit correction.
async fn credit_adjustment(
    State(state): State<AppState>,
    Json(payload): Json<CreditRequest>,
) -> ApiResult<impl IntoResponse> {
    let reference_code = ReferenceCode::external(payload.reference_code)?;
    let description = payload
        .description
        .unwrap_or_else(|| format!("Adjustment {reference_code}"));
    let outcome = state
        .engine
        .credit_adjustment(
            payload.owner_id,
            payload.amount,
            reference_code,
            description,
        )
        .await?;
    Ok(outcome_response(outcome))
}

/// POST `/unlinked-credits/{id}/link` - Applies a parked credit to the owner's new wallet.
async fn link_unlinked_credit(
    State(state): State<AppState>,
    Path(id): Path<UnlinkedCreditId>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.engine.link_unlinked_credit(id).await?;
    Ok(outcome_response(outcome))
}
