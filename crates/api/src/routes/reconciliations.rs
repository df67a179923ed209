//! COD reconciliation routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use coffer_core::reconciliation::CodReconciliation;
use coffer_shared::types::{Money, OwnerId, ReconciliationId};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the reconciliation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reconciliations",
            get(list_by_date).post(create_reconciliation),
        )
        .route("/reconciliations/{id}", get(get_reconciliation))
        .route("/reconciliations/{id}/totals", put(update_totals))
        .route("/reconciliations/{id}/advance", post(advance))
        .route("/reconciliations/{id}/corrections", post(correct))
}

/// Request body for opening a reconciliation.
#[derive(Debug, Deserialize)]
pub struct CreateReconciliationRequest {
    /// Shipper the cash belongs to.
    pub shipper_id: OwnerId,
    /// Delivery day.
    pub date: NaiveDate,
    /// Cash collected from recipients.
    pub total_collected: Money,
    /// Cash handed in by the shipper.
    pub total_deposited: Money,
}

/// Request body for correcting totals, before settlement or through a correction row.
#[derive(Debug, Deserialize)]
pub struct UpdateTotalsRequest {
    /// Cash collected from recipients.
    pub total_collected: Money,
    /// Cash handed in by the shipper.
    pub total_deposited: Money,
}

/// Query parameters for listing one day.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    /// Delivery day.
    pub date: NaiveDate,
}

/// POST `/reconciliations`
async fn create_reconciliation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReconciliationRequest>,
) -> ApiResult<impl IntoResponse> {
    let reconciliation = state
        .engine
        .create_reconciliation(
            payload.shipper_id,
            payload.date,
            payload.total_collected,
            payload.total_deposited,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(reconciliation)))
}

/// GET `/reconciliations?date=YYYY-MM-DD`
async fn list_by_date(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<CodReconciliation>>> {
    Ok(Json(state.engine.reconciliations_by_date(query.date).await?))
}

/// GET `/reconciliations/{id}`
async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<ReconciliationId>,
) -> ApiResult<Json<CodReconciliation>> {
    Ok(Json(state.engine.get_reconciliation(id).await?))
}

/// PUT `/reconciliations/{id}/totals` - Rejected once the reconciliation is DONE.
async fn update_totals(
    State(state): State<AppState>,
    Path(id): Path<ReconciliationId>,
    Json(payload): Json<UpdateTotalsRequest>,
) -> ApiResult<Json<CodReconciliation>> {
    Ok(Json(
        state
            .engine
            .update_reconciliation_totals(id, payload.total_collected, payload.total_deposited)
            .await?,
    ))
}

/// POST `/reconciliations/{id}/advance` - PENDING → PROCESSING → DONE.
///
/// DONE settles the deposit.
async fn advance(
    State(state): State<AppState>,
    Path(id): Path<ReconciliationId>,
) -> ApiResult<Json<CodReconciliation>> {
    Ok(Json(state.engine.advance_reconciliation(id).await?))
}

/// POST `/reconciliations/{id}/corrections` - Opens a correction of a DONE reconciliation.
///
/// The correction carries the full corrected figures and credits only the extra deposit once
/// it is advanced to DONE.
async fn correct(
    State(state): State<AppState>,
    Path(id): Path<ReconciliationId>,
    Json(payload): Json<UpdateTotalsRequest>,
) -> ApiResult<impl IntoResponse> {
    let correction = state
        .engine
        .correct_reconciliation(id, payload.total_collected, payload.total_deposited)
        .await?;
    Ok((StatusCode::CREATED, Json(correction)))
}
