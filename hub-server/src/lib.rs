//! Hub Server - 场馆预付钱包与点单结算服务
//!
//! # 架构概述
//!
//! - **账本** (`ledger`): redb 存储，代金券、钱包、订单与原子结算
//! - **认证** (`auth`): 员工名单 + JWT，按角色下发权限
//! - **HTTP API** (`api`): 员工终端、客户设备与管理端接口
//! - **后台任务** (`core::tasks`): 过期订单清理、日志清理
//!
//! # 模块结构
//!
//! ```text
//! hub-server/src/
//! ├── core/          # 配置、状态、错误、后台任务、服务器
//! ├── auth/          # JWT 认证、权限、员工名单
//! ├── ledger/        # 账本存储与业务操作
//! ├── services/      # 路由装配与 HTTP 中间件
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod ledger;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use ledger::{Ledger, LedgerError};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    __  __      __
   / / / /_  __/ /_
  / /_/ / / / / __ \
 / __  / /_/ / /_/ /
/_/ /_/\__,_/_.___/
    "#
    );
}

/// 设置运行环境：加载 `.env`、读取配置、创建工作目录、初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    // .env 不存在时忽略
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        log_dir.to_str(),
    )?;

    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "Environment ready"
    );
    Ok(config)
}
