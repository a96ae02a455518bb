//! Reports API 模块 (管理端，只读)

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::permissions::REPORTS_VIEW;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reports", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/dashboard", get(handler::dashboard))
        .route("/recent-orders", get(handler::recent_orders))
        .route("/low-stock", get(handler::low_stock))
        .route("/reconciliation", get(handler::reconciliation))
        .route("/anomalies", get(handler::anomalies))
        .layer(middleware::from_fn(require_permission(REPORTS_VIEW)))
}
