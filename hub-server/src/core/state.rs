use std::sync::Arc;

use crate::auth::{JwtService, StaffRoster};
use crate::core::{Config, ServerError};
use crate::ledger::Ledger;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | ledger | Arc<Ledger> | 账本 (redb) 与订单事件广播 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | roster | Arc<StaffRoster> | 员工名单 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub ledger: Arc<Ledger>,
    pub jwt_service: Arc<JwtService>,
    pub roster: Arc<StaffRoster>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 代替
    pub fn new(
        config: Config,
        ledger: Arc<Ledger>,
        jwt_service: Arc<JwtService>,
        roster: Arc<StaffRoster>,
    ) -> Self {
        Self {
            config,
            ledger,
            jwt_service,
            roster,
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录结构
    /// 2. 打开账本数据库 `{work_dir}/database/ledger.redb`
    /// 3. 加载员工名单
    pub async fn initialize(config: &Config) -> Result<Self, ServerError> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_path();
        let settings = config.ledger_settings();
        let ledger = tokio::task::spawn_blocking(move || Ledger::open(db_path, settings))
            .await
            .map_err(|e| ServerError::Internal(e.into()))??;
        tracing::info!(path = %config.database_path().display(), "Ledger database opened");

        let roster_path = config.roster_path();
        let roster = tokio::task::spawn_blocking(move || StaffRoster::load(roster_path))
            .await
            .map_err(|e| ServerError::Internal(e.into()))??;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self::new(
            config.clone(),
            Arc::new(ledger),
            jwt_service,
            Arc::new(roster),
        ))
    }

    /// 获取账本
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// 获取 JWT 服务
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// 获取员工名单
    pub fn roster(&self) -> &StaffRoster {
        &self.roster
    }
}
