//! Wallet routes.
//!
//! Every route is keyed by the owner id (shop or shipper); callers never address a wallet by its
//! internal id.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use coffer_core::NewWithdrawal;
use coffer_core::ledger::{AuditReport, WalletTransaction};
use coffer_core::settlement::UnlinkedCredit;
use coffer_core::wallet::{BankInfo, WalletAccount};
use coffer_core::withdrawal::WithdrawalRequest;
use coffer_shared::types::{Money, OwnerId, PageRequest, PageResponse};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{owner_id}", get(get_wallet))
        .route("/wallets/{owner_id}/bank-info", put(update_bank_info))
        .route("/wallets/{owner_id}/status", put(set_status))
        .route("/wallets/{owner_id}/transactions", get(list_transactions))
        .route(
            "/wallets/{owner_id}/withdrawals",
            get(list_withdrawals).post(request_withdrawal),
        )
        .route("/wallets/{owner_id}/audit", get(audit_wallet))
        .route(
            "/wallets/{owner_id}/unlinked-credits",
            get(list_unlinked_credits),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Bank payout details. Blank or missing fields are reported as `MISSING_BANK_INFO`.
#[derive(Debug, Default, Deserialize)]
pub struct BankInfoRequest {
    /// Receiving bank.
    #[serde(default)]
    pub bank_name: String,
    /// Account number.
    #[serde(default)]
    pub bank_account_number: String,
    /// Account holder.
    #[serde(default)]
    pub bank_account_name: String,
}

impl From<BankInfoRequest> for BankInfo {
    fn from(req: BankInfoRequest) -> Self {
        Self::new(
            req.bank_name,
            req.bank_account_number,
            req.bank_account_name,
        )
    }
}

/// Request body for creating a wallet.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// Shop or shipper the wallet belongs to.
    pub owner_id: OwnerId,
    /// Payout details.
    #[serde(flatten)]
    pub bank: BankInfoRequest,
}

/// Request body for locking or unlocking a wallet.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Whether the wallet accepts withdrawal requests.
    pub is_active: bool,
}

/// Request body for a withdrawal request.
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequestBody {
    /// Amount in minor units.
    pub amount: Money,
    /// Payout details; the wallet's own are used when absent.
    #[serde(default)]
    pub bank: Option<BankInfoRequest>,
    /// Owner's note.
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/wallets` - Creates a wallet.
///
/// Credits that arrived before the wallet existed are reported in `pending_unlinked_credits`;
/// they are applied through `/unlinked-credits/{id}/link`.
async fn create_wallet(
    State(state): State<AppState>,
    Json(payload): Json<CreateWalletRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = state
        .engine
        .create_wallet(payload.owner_id, payload.bank.into())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET `/wallets/{owner_id}`
async fn get_wallet(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> ApiResult<Json<WalletAccount>> {
    Ok(Json(state.engine.get_wallet(owner_id).await?))
}

/// PUT `/wallets/{owner_id}/bank-info`
async fn update_bank_info(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Json(payload): Json<BankInfoRequest>,
) -> ApiResult<Json<WalletAccount>> {
    Ok(Json(
        state
            .engine
            .update_bank_info(owner_id, payload.into())
            .await?,
    ))
}

/// PUT `/wallets/{owner_id}/status`
async fn set_status(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Json(payload): Json<SetStatusRequest>,
) -> ApiResult<Json<WalletAccount>> {
    Ok(Json(
        state
            .engine
            .set_active(owner_id, payload.is_active)
            .await?,
    ))
}

/// GET `/wallets/{owner_id}/transactions?page&per_page` - Ledger entries, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<WalletTransaction>>> {
    Ok(Json(state.engine.transactions(owner_id, page).await?))
}

/// GET `/wallets/{owner_id}/withdrawals?page&per_page` - Requests, newest first.
async fn list_withdrawals(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<WithdrawalRequest>>> {
    Ok(Json(state.engine.withdrawals(owner_id, page).await?))
}

/// POST `/wallets/{owner_id}/withdrawals` - Reserves funds and opens a PENDING request.
async fn request_withdrawal(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Json(payload): Json<WithdrawalRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .engine
        .request_withdrawal(
            owner_id,
            NewWithdrawal {
                amount: payload.amount,
                bank: payload.bank.map(Into::into),
                note: payload.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET `/wallets/{owner_id}/audit` - Replays the ledger against the stored counters.
async fn audit_wallet(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> ApiResult<Json<AuditReport>> {
    Ok(Json(state.engine.audit(owner_id).await?))
}

/// GET `/wallets/{owner_id}/unlinked-credits`
async fn list_unlinked_credits(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> ApiResult<impl IntoResponse> {
    let credits: Vec<UnlinkedCredit> = state.engine.list_unlinked_credits(owner_id).await?;
    let pending = credits.iter().filter(|credit| !credit.is_linked()).count();
    Ok(Json(json!({
        "pending": pending,
        "credits": credits
    })))
}
