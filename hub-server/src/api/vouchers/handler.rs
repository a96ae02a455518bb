//! Voucher API Handlers

use axum::{
    Json,
    extract::{Extension, Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{
    MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_required_text,
};
use shared::models::{Voucher, VoucherIssue, VoucherPreview, VoucherRedeem, VoucherVoid, Wallet};

/// POST /api/vouchers - 发行代金券
pub async fn issue(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<VoucherIssue>,
) -> AppResult<Json<Voucher>> {
    let voucher = state
        .ledger
        .blocking(move |l| l.issue_voucher(&current_user, payload.face_value))
        .await?;
    Ok(Json(voucher))
}

/// POST /api/vouchers/{code}/void - 作废未兑换的代金券
pub async fn void(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(code): Path<String>,
    Json(payload): Json<VoucherVoid>,
) -> AppResult<Json<Voucher>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let voucher = state
        .ledger
        .blocking(move |l| l.void_voucher(&current_user, &code, payload.reason))
        .await?;
    Ok(Json(voucher))
}

/// GET /api/vouchers/{code} - 兑换前预览 (不含兑换码与手机号)
pub async fn get_by_code(
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> AppResult<Json<VoucherPreview>> {
    let voucher = state.ledger.blocking(move |l| l.get_voucher(&code)).await?;
    Ok(Json(VoucherPreview::from(&voucher)))
}

/// POST /api/vouchers/{code}/redeem - 兑换到手机号钱包
pub async fn redeem(
    State(state): State<ServerState>,
    Path(code): Path<String>,
    Json(payload): Json<VoucherRedeem>,
) -> AppResult<Json<Wallet>> {
    validate_required_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    let wallet = state
        .ledger
        .blocking(move |l| l.redeem_voucher(&code, &payload.phone))
        .await?;
    Ok(Json(wallet))
}
