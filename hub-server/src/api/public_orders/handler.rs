//! Public order handlers (client device)

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use shared::models::{ClientOrderView, Order, OrderCancel, OrderConfirm};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// GET /api/public/orders/{id}?token= - 订单、明细与钱包余额
pub async fn view(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<ClientOrderView>> {
    let view = state
        .ledger
        .blocking(move |l| l.client_order_view(id, &query.token))
        .await?;
    Ok(Json(view))
}

/// POST /api/public/orders/{id}/confirm - 确认并结算
pub async fn confirm(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderConfirm>,
) -> AppResult<Json<Order>> {
    let order = state
        .ledger
        .blocking(move |l| l.confirm_order(id, &payload.token))
        .await?;
    Ok(Json(order))
}

/// POST /api/public/orders/{id}/cancel - 客户拒绝
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderCancel>,
) -> AppResult<Json<Order>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let order = state
        .ledger
        .blocking(move |l| l.cancel_order(id, &payload.token, payload.reason))
        .await?;
    Ok(Json(order))
}
