//! Menu API 模块

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::permissions::MENU_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu", routes())
}

fn routes() -> Router<ServerState> {
    // 公共菜单 (仅可售商品)
    let public_routes = Router::new().route("/", get(handler::list_available));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route("/all", get(handler::list_all))
        .route("/{id}", put(handler::update))
        .layer(middleware::from_fn(require_permission(MENU_MANAGE)));

    public_routes.merge(manage_routes)
}
