//! Wallet API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::WalletView;

/// GET /api/wallets/by-phone/{phone} - 余额与最近 10 条流水
pub async fn by_phone(
    State(state): State<ServerState>,
    Path(phone): Path<String>,
) -> AppResult<Json<WalletView>> {
    let view = state.ledger.blocking(move |l| l.wallet_by_phone(&phone)).await?;
    Ok(Json(view))
}
