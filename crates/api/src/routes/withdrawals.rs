//! Operator withdrawal routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use coffer_core::withdrawal::{WithdrawalRequest, WithdrawalStatus};
use coffer_shared::types::{PageRequest, PageResponse, WithdrawalId};
use serde::Deserialize;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

/// Creates the withdrawal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/withdrawals", get(list_by_status))
        .route("/withdrawals/{id}", get(get_withdrawal))
        .route("/withdrawals/{id}/approve", post(approve))
        .route("/withdrawals/{id}/complete", post(complete))
        .route("/withdrawals/{id}/reject", post(reject))
}

/// Query parameters for the operator queue.
#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Status to list; PENDING when absent.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Optional body for operator actions.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    /// Operator's note, kept on the request.
    #[serde(default)]
    pub admin_note: Option<String>,
}

/// GET `/withdrawals?status=&page&per_page` - Requests in one status, oldest first.
async fn list_by_status(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<PageResponse<WithdrawalRequest>>> {
    let status = match query.status.as_deref() {
        None => WithdrawalStatus::Pending,
        Some(raw) => WithdrawalStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(
                "INVALID_STATUS",
                format!("Unknown withdrawal status: {raw}"),
            )
        })?,
    };
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        query.page.unwrap_or(defaults.page),
        query.per_page.unwrap_or(defaults.per_page),
    );
    Ok(Json(state.engine.withdrawals_by_status(status, page).await?))
}

/// GET `/withdrawals/{id}`
async fn get_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<WithdrawalId>,
) -> ApiResult<Json<WithdrawalRequest>> {
    Ok(Json(state.engine.get_withdrawal(id).await?))
}

/// POST `/withdrawals/{id}/approve` - PENDING → APPROVED.
async fn approve(
    State(state): State<AppState>,
    Path(id): Path<WithdrawalId>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<WithdrawalRequest>> {
    let note = body.and_then(|Json(body)| body.admin_note);
    Ok(Json(state.engine.approve_withdrawal(id, note).await?))
}

/// POST `/withdrawals/{id}/complete` - APPROVED → COMPLETED.
async fn complete(
    State(state): State<AppState>,
    Path(id): Path<WithdrawalId>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<WithdrawalRequest>> {
    let note = body.and_then(|Json(body)| body.admin_note);
    Ok(Json(state.engine.complete_withdrawal(id, note).await?))
}

/// POST `/withdrawals/{id}/reject` - PENDING or APPROVED → REJECTED, returning the funds.
async fn reject(
    State(state): State<AppState>,
    Path(id): Path<WithdrawalId>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<WithdrawalRequest>> {
    let note = body.and_then(|Json(body)| body.admin_note);
    Ok(Json(state.engine.reject_withdrawal(id, note).await?))
}
