use thiserror::Error;

use crate::auth::{JwtError, RosterError};
use crate::ledger::LedgerError;

/// 服务器启动与运行期错误
///
/// 请求级错误走 [`AppError`](crate::AppError)，这里只覆盖启动、配置和后台流程
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("JWT 配置错误: {0}")]
    Jwt(#[from] JwtError),

    #[error("账本错误: {0}")]
    Ledger(#[from] LedgerError),

    #[error("员工名单错误: {0}")]
    Roster(#[from] RosterError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 服务器 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
