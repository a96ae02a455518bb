use crate::auth::require_auth;
use crate::core::ServerState;
use axum::{Router, middleware};
use http::StatusCode;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: "http_access",
        request_id = %request_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{} {} {}",
        method,
        uri.path(),
        response.status()
    );

    response
}

/// Build the Axum router (without state)
///
/// 不含确认长轮询路由，它不受请求超时限制，由 [`build_router`] 单独挂载
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(crate::api::health::router())
        .merge(crate::api::auth::router())
        .merge(crate::api::vouchers::router())
        .merge(crate::api::wallets::router())
        .merge(crate::api::menu::router())
        .merge(crate::api::orders::router())
        .merge(crate::api::public_orders::router())
        .merge(crate::api::reports::router())
}

/// Build the full application with state and middleware
pub fn build_router(state: ServerState) -> Router {
    let timed = build_app().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        state.config.request_timeout(),
    ));

    timed
        .merge(crate::api::orders::long_poll_router())
        // JWT 认证中间件 - 在 Router 级别应用，require_auth 内部会跳过公共路由
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        // Tower HTTP 中间件
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(log_request))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
