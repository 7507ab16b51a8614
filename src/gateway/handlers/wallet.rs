//! Wallet and transaction history handlers

use std::sync::Arc;

use axum::{Extension, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, ok};
use crate::account::WalletSummary;
use crate::ledger::Transaction;
use crate::user_auth::AuthenticatedAccount;

/// Balances of all three pools
///
/// GET /api/v1/wallet
#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    responses(
        (status = 200, description = "Wallet summary", body = ApiResponse<WalletSummary>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> ApiResult<WalletSummary> {
    ok(state.services.ledger.wallet(caller.account_id).await?)
}

/// Most recent transactions first
///
/// GET /api/v1/transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transaction history", body = ApiResponse<Vec<Transaction>>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []), ("session_cookie" = [])),
    tag = "Wallet"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> ApiResult<Vec<Transaction>> {
    ok(state.services.ledger.history(caller.account_id).await?)
}
