//! Voucher API 模块
//!
//! | 路径 | 方法 | 权限 |
//! |------|------|------|
//! | /api/vouchers | POST | vouchers:issue |
//! | /api/vouchers/{code} | GET | 公共 (仅预览) |
//! | /api/vouchers/{code}/void | POST | vouchers:issue |
//! | /api/vouchers/{code}/redeem | POST | 公共 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::permissions::VOUCHERS_ISSUE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/vouchers", routes())
}

fn routes() -> Router<ServerState> {
    let issue_routes = Router::new()
        .route("/", post(handler::issue))
        .route("/{code}/void", post(handler::void))
        .layer(middleware::from_fn(require_permission(VOUCHERS_ISSUE)));

    // 客户扫码后访问，无需登录
    let client_routes = Router::new()
        .route("/{code}", get(handler::get_by_code))
        .route("/{code}/redeem", post(handler::redeem));

    issue_routes.merge(client_routes)
}
