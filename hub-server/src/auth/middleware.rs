//! 认证中间件
//!
//! 为 JWT 认证和授权提供 Axum 中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::Method;

use crate::AppError;
use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

/// 客户端设备可直接访问的 API (无需员工登录)
///
/// - `POST /api/auth/login`
/// - `GET /api/vouchers/{code}` 与 `POST /api/vouchers/{code}/redeem`
/// - `GET /api/wallets/by-phone/{phone}`
/// - `GET /api/menu`
/// - `/api/public/*` (订单确认页，凭确认令牌访问)
pub fn is_public_api_route(method: &Method, path: &str) -> bool {
    if path == "/api/auth/login" || path.starts_with("/api/public/") {
        return true;
    }
    // 发券与作废需要登录，预览与兑换不需要
    if path.starts_with("/api/vouchers/") && !path.ends_with("/void") {
        return true;
    }
    if *method == Method::GET
        && (path == "/api/menu" || path.starts_with("/api/wallets/by-phone/"))
    {
        return true;
    }
    false
}

/// 认证中间件 - 要求员工登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT。
/// 验证成功后将 [`CurrentUser`] 注入请求扩展。
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径
/// - [`is_public_api_route`] 列出的客户端接口
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 Unauthorized |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 InvalidToken |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_api_route(req.method(), path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    let claims = match state.jwt_service().validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );
            return match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            };
        }
    };

    let user = CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// 权限检查中间件 - 要求特定权限
///
/// ```ignore
/// use axum::middleware;
/// Router::new()
///     .route("/api/vouchers", post(handler::issue))
///     .route_layer(middleware::from_fn(require_permission(VOUCHERS_ISSUE)));
/// ```
///
/// 无权限返回 403 Forbidden
pub fn require_permission(
    permission: &'static str,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or(AppError::unauthorized())?;

            if !user.has_permission(permission) {
                security_log!(
                    "WARN",
                    "permission_denied",
                    user_id = user.id,
                    username = user.username.clone(),
                    required_permission = permission
                );
                return Err(AppError::forbidden(format!(
                    "Permission denied: {}",
                    permission
                )));
            }

            Ok(next.run(req).await)
        })
    }
}
