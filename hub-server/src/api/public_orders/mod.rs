//! 客户确认页 API
//!
//! 无需员工登录，每个请求都必须携带下单时生成的确认令牌。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/public/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}", get(handler::view))
        .route("/{id}/confirm", post(handler::confirm))
        .route("/{id}/cancel", post(handler::cancel))
}
