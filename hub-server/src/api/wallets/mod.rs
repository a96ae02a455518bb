//! Wallet API 模块 (公共，客户凭手机号查看余额)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/wallets/by-phone/{phone}", get(handler::by_phone))
}
