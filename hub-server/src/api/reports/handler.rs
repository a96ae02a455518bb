//! Reports API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{Anomaly, DashboardStats, MenuItem, ReconciliationReport, RecentOrder};

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// GET /api/reports/dashboard
pub async fn dashboard(State(state): State<ServerState>) -> AppResult<Json<DashboardStats>> {
    let now = shared::util::now_millis();
    let stats = state.ledger.blocking(move |l| l.dashboard_stats(now)).await?;
    Ok(Json(stats))
}

/// GET /api/reports/recent-orders?limit=
pub async fn recent_orders(
    State(state): State<ServerState>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<RecentOrder>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let orders = state.ledger.blocking(move |l| l.recent_orders(limit)).await?;
    Ok(Json(orders))
}

/// GET /api/reports/low-stock
pub async fn low_stock(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    let items = state.ledger.blocking(|l| l.low_stock_items()).await?;
    Ok(Json(items))
}

/// GET /api/reports/reconciliation - 余额与流水核对
pub async fn reconciliation(
    State(state): State<ServerState>,
) -> AppResult<Json<ReconciliationReport>> {
    let report = state.ledger.blocking(|l| l.reconcile_all()).await?;
    Ok(Json(report))
}

/// GET /api/reports/anomalies
pub async fn anomalies(State(state): State<ServerState>) -> AppResult<Json<Vec<Anomaly>>> {
    let anomalies = state.ledger.blocking(|l| l.list_anomalies()).await?;
    Ok(Json(anomalies))
}
