//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 简单健康检查 | 无 |
//! | /health/detailed | GET | 详细健康检查 (含存储) | 无 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "epoch": "2b0c8e0e-..."
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;
use crate::ledger::StorageStats;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 简单健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// 本次启动的实例标识
    epoch: String,
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    checks: HealthChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageStats>,
}

#[derive(Serialize)]
pub struct HealthChecks {
    /// 账本存储检查
    storage: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | error)
    status: &'static str,
    latency_ms: Option<u64>,
    message: Option<String>,
}

impl CheckResult {
    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 基础健康检查
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    START_TIME.get_or_init(SystemTime::now);
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.ledger.epoch().to_string(),
    })
}

/// 包含存储状态的详细健康检查
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    // 读事务统计各表行数，顺便验证存储可用
    let started = std::time::Instant::now();
    let (check, storage) = match state.ledger.blocking(|l| Ok(l.storage().get_stats()?)).await {
        Ok(stats) => (
            CheckResult::ok_with_latency(started.elapsed().as_millis() as u64),
            Some(stats),
        ),
        Err(e) => (CheckResult::error(format!("Storage error: {}", e)), None),
    };

    Json(DetailedHealthResponse {
        status: if check.status == "ok" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks { storage: check },
        storage,
    })
}
