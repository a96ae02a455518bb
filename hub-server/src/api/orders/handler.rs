//! Order API Handlers

use std::time::Duration;

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult};
use shared::models::{ConfirmationOutcome, Order, OrderCreate, OrderDetail, OrderWithdraw, PendingOrder};

#[derive(Debug, Deserialize)]
pub struct AwaitQuery {
    /// 上限为 `CONFIRMATION_TIMEOUT_SECS`
    pub timeout_secs: Option<u64>,
}

/// POST /api/orders - 下单并生成客户确认链接
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<PendingOrder>> {
    let pending = state
        .ledger
        .blocking(move |l| l.create_order(&current_user, payload))
        .await?;
    Ok(Json(pending))
}

/// GET /api/orders/{id} - 订单及明细
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.ledger.blocking(move |l| l.get_order_detail(id)).await?;
    Ok(Json(detail))
}

/// GET /api/orders/{id}/await - 等待客户确认或拒绝
///
/// 请求在订单进入终态、超时或终端断开时结束；后两种情况订单被撤回。
pub async fn await_confirmation(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(query): Query<AwaitQuery>,
) -> AppResult<Json<ConfirmationOutcome>> {
    let timeout = query.timeout_secs.map(Duration::from_secs);
    let cancel = CancellationToken::new();
    // 终端断开时 axum 丢弃该 future，guard 触发取消，等待任务撤回订单
    let _disconnect_guard = cancel.clone().drop_guard();

    let ledger = state.ledger.clone();
    let wait = tokio::spawn(async move {
        ledger
            .await_confirmation(&current_user, id, timeout, cancel)
            .await
    });

    let outcome = wait
        .await
        .map_err(|e| AppError::internal(format!("Confirmation wait failed: {}", e)))??;
    Ok(Json(outcome))
}

/// POST /api/orders/{id}/withdraw - 员工清空购物车
pub async fn withdraw(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderWithdraw>,
) -> AppResult<Json<Order>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let order = state
        .ledger
        .blocking(move |l| l.withdraw_order(&current_user, id, payload.reason))
        .await?;
    Ok(Json(order))
}
