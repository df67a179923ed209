//! Shipper-scoped routes: reconciliation history and daily cash balance.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use coffer_core::history::ShipperBalanceHistory;
use coffer_core::reconciliation::CodReconciliation;
use coffer_shared::types::{Money, OwnerId, PageRequest, PageResponse};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the shipper routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shippers/{shipper_id}/reconciliations",
            get(list_reconciliations),
        )
        .route(
            "/shippers/{shipper_id}/balance-history",
            get(list_balance_history).post(record_balance_history),
        )
}

/// Request body for closing a shipper's day.
#[derive(Debug, Deserialize)]
pub struct RecordBalanceRequest {
    /// Day being closed.
    pub date: NaiveDate,
    /// Cash collected that day.
    pub collected: Money,
    /// Cash deposited that day.
    pub deposited: Money,
    /// Bonus credited to the shipper's cash position.
    #[serde(default)]
    pub bonus: Money,
}

/// Inclusive date window.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// First day.
    pub from: Option<NaiveDate>,
    /// Last day.
    pub to: Option<NaiveDate>,
}

/// GET `/shippers/{shipper_id}/reconciliations?page&per_page` - Latest day first.
async fn list_reconciliations(
    State(state): State<AppState>,
    Path(shipper_id): Path<OwnerId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<CodReconciliation>>> {
    Ok(Json(
        state
            .engine
            .reconciliations_for_shipper(shipper_id, page)
            .await?,
    ))
}

/// POST `/shippers/{shipper_id}/balance-history`
async fn record_balance_history(
    State(state): State<AppState>,
    Path(shipper_id): Path<OwnerId>,
    Json(payload): Json<RecordBalanceRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .engine
        .record_balance_history(
            shipper_id,
            payload.date,
            payload.collected,
            payload.deposited,
            payload.bonus,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET `/shippers/{shipper_id}/balance-history?from&to` - Ascending by date.
async fn list_balance_history(
    State(state): State<AppState>,
    Path(shipper_id): Path<OwnerId>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ShipperBalanceHistory>>> {
    Ok(Json(
        state
            .engine
            .balance_history(shipper_id, query.from, query.to)
            .await?,
    ))
}
