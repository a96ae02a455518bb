//! Order API 模块 (员工端)
//!
//! | 路径 | 方法 | 权限 | 说明 |
//! |------|------|------|------|
//! | /api/orders | POST | orders:create | 下单，返回确认链接与令牌 |
//! | /api/orders/{id} | GET | orders:create | 订单详情 |
//! | /api/orders/{id}/await | GET | orders:create | 等待客户确认 (长轮询) |
//! | /api/orders/{id}/withdraw | POST | orders:withdraw | 清空购物车 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::permissions::{ORDERS_CREATE, ORDERS_WITHDRAW};
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

/// 长轮询路由，单独挂载在请求超时层之外
pub fn long_poll_router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders/{id}/await", get(handler::await_confirmation))
        .layer(middleware::from_fn(require_permission(ORDERS_CREATE)))
}

fn routes() -> Router<ServerState> {
    let create_routes = Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .layer(middleware::from_fn(require_permission(ORDERS_CREATE)));

    let withdraw_routes = Router::new()
        .route("/{id}/withdraw", post(handler::withdraw))
        .layer(middleware::from_fn(require_permission(ORDERS_WITHDRAW)));

    create_routes.merge(withdraw_routes)
}
