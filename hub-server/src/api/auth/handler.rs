//! Authentication Handlers
//!
//! Staff log in with phone + one-time code from the roster

use std::time::Duration;

use axum::{Json, extract::State};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::auth::permissions::get_default_permissions;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, AppResult};
use shared::models::{LoginRequest, LoginResponse, StaffInfo};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// Login handler
///
/// Verifies the one-time code and returns a JWT carrying role permissions
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    // argon2 校验较慢，放到阻塞线程池
    let roster = state.roster.clone();
    let (phone, otp) = (req.phone.clone(), req.otp);
    let member = tokio::task::spawn_blocking(move || roster.authenticate(&phone, &otp))
        .await
        .map_err(|e| AppError::internal(format!("Authentication task failed: {}", e)))?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // 未知号码、停用账号、错误口令统一返回同一错误
    let Some(member) = member else {
        security_log!("WARN", "login_failed", phone = req.phone.clone());
        return Err(AppError::invalid_credentials());
    };

    let permissions = get_default_permissions(member.role);
    let jwt_service = state.jwt_service();
    let token = jwt_service
        .generate_token(
            &member.id.to_string(),
            &member.name,
            member.role.as_str(),
            &permissions,
        )
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        staff_id = member.id,
        name = %member.name,
        role = member.role.as_str(),
        "Staff logged in successfully"
    );

    Ok(Json(LoginResponse {
        token,
        expires_in: jwt_service.expires_in_seconds(),
        user: StaffInfo {
            id: member.id,
            phone: member.phone,
            name: member.name,
            role: member.role,
            permissions,
        },
    }))
}

/// Get current staff session
///
/// `CurrentUser` comes from the extractor, which reuses the session the
/// middleware already validated.
pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<StaffInfo>> {
    let member = state
        .roster()
        .find_active(user.id)
        .ok_or_else(|| AppError::invalid_token("Staff member is no longer active"))?;

    Ok(Json(StaffInfo {
        id: member.id,
        phone: member.phone.clone(),
        name: member.name.clone(),
        role: member.role,
        permissions: user.permissions,
    }))
}
