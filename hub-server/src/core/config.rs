use std::path::PathBuf;
use std::time::Duration;

use crate::auth::JwtConfig;
use crate::core::ServerError;
use crate::ledger::LedgerSettings;

/// 服务器配置 - 场馆 hub 的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 9625 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志格式 |
/// | PUBLIC_BASE_URL | http://localhost:{HTTP_PORT} | 客户端确认链接前缀 |
/// | VOUCHER_FACE_VALUE | 500 | 默认面值 |
/// | MAX_VOUCHER_FACE_VALUE | 10000 | 面值上限 |
/// | CONFIRMATION_TIMEOUT_SECS | 300 | 员工端等待确认上限 |
/// | PENDING_ORDER_MAX_AGE_SECS | 600 | 待确认订单最长存活 |
/// | SWEEP_INTERVAL_SECS | 30 | 过期订单清理周期 |
/// | STAFF_ROSTER_PATH | {WORK_DIR}/staff.json | 员工名单文件 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒)，不含确认等待 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
/// | JWT_SECRET / JWT_EXPIRATION_MINUTES | - | 见 [`JwtConfig`] |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/hub HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,

    // === 业务配置 ===
    /// 确认链接前缀 (客户端扫码打开)
    pub public_base_url: String,
    pub voucher_face_value: f64,
    pub max_voucher_face_value: f64,
    pub confirmation_timeout_secs: u64,
    pub pending_order_max_age_secs: u64,
    pub sweep_interval_secs: u64,
    /// 员工名单文件 (None 表示 `{WORK_DIR}/staff.json`)
    pub staff_roster_path: Option<String>,

    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的项使用默认值；JWT 配置错误 (如生产环境缺少密钥) 直接返回错误
    pub fn from_env() -> Result<Self, ServerError> {
        let http_port = env_or("HTTP_PORT", 9625u16);
        let config = Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port,
            jwt: JwtConfig::from_env()?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", http_port)),
            voucher_face_value: env_or("VOUCHER_FACE_VALUE", 500.0),
            max_voucher_face_value: env_or("MAX_VOUCHER_FACE_VALUE", 10_000.0),
            confirmation_timeout_secs: env_or("CONFIRMATION_TIMEOUT_SECS", 300),
            pending_order_max_age_secs: env_or("PENDING_ORDER_MAX_AGE_SECS", 600),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", 30),
            staff_roster_path: std::env::var("STAFF_ROSTER_PATH").ok(),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30_000),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10_000),
        };
        config.validate()?;
        Ok(config)
    }

    /// 使用自定义工作目录和端口覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Result<Self, ServerError> {
        let mut config = Self::from_env()?;
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServerError> {
        if !(self.voucher_face_value > 0.0 && self.voucher_face_value <= self.max_voucher_face_value)
        {
            return Err(ServerError::Config(format!(
                "VOUCHER_FACE_VALUE must be in (0, {}], got {}",
                self.max_voucher_face_value, self.voucher_face_value
            )));
        }
        if self.confirmation_timeout_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(ServerError::Config(
                "CONFIRMATION_TIMEOUT_SECS and SWEEP_INTERVAL_SECS must be positive".to_string(),
            ));
        }
        // 清理器不能抢在员工端等待结束前回收订单
        if self.pending_order_max_age_secs < self.confirmation_timeout_secs {
            return Err(ServerError::Config(format!(
                "PENDING_ORDER_MAX_AGE_SECS ({}) must not be shorter than CONFIRMATION_TIMEOUT_SECS ({})",
                self.pending_order_max_age_secs, self.confirmation_timeout_secs
            )));
        }
        Ok(())
    }

    /// 数据库目录 `{work_dir}/database`
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 数据库文件 `{work_dir}/database/ledger.redb`
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("ledger.redb")
    }

    /// 日志目录 `{work_dir}/logs`
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn roster_path(&self) -> PathBuf {
        match &self.staff_roster_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.work_dir).join("staff.json"),
        }
    }

    /// 创建工作目录结构
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// 账本业务配置
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            default_face_value: self.voucher_face_value,
            max_face_value: self.max_voucher_face_value,
            public_base_url: self.public_base_url.clone(),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            pending_order_max_age: Duration::from_secs(self.pending_order_max_age_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            work_dir: "/tmp/hub".into(),
            http_port: 9625,
            jwt: JwtConfig::ephemeral().unwrap(),
            environment: "development".into(),
            log_level: "info".into(),
            log_json: false,
            public_base_url: "http://10.0.0.2:9625".into(),
            voucher_face_value: 500.0,
            max_voucher_face_value: 10_000.0,
            confirmation_timeout_secs: 300,
            pending_order_max_age_secs: 600,
            sweep_interval_secs: 60,
            staff_roster_path: None,
            request_timeout_ms: 30_000,
            shutdown_timeout_ms: 10_000,
        }
    }

    #[test]
    fn test_paths() {
        let config = sample_config();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/hub/database/ledger.redb"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/hub/logs"));
        assert_eq!(config.roster_path(), PathBuf::from("/tmp/hub/staff.json"));

        let config = Config {
            staff_roster_path: Some("/etc/hub/staff.json".into()),
            ..config
        };
        assert_eq!(config.roster_path(), PathBuf::from("/etc/hub/staff.json"));
    }

    #[test]
    fn test_ledger_settings() {
        let settings = sample_config().ledger_settings();
        assert_eq!(settings.default_face_value, 500.0);
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(300));
        assert_eq!(settings.pending_order_max_age, Duration::from_secs(600));
        assert_eq!(settings.public_base_url, "http://10.0.0.2:9625");
    }

    #[test]
    fn test_validate() {
        assert!(sample_config().validate().is_ok());

        let bad_face = Config {
            voucher_face_value: 20_000.0,
            ..sample_config()
        };
        assert!(matches!(bad_face.validate(), Err(ServerError::Config(_))));

        let sweeper_too_eager = Config {
            pending_order_max_age_secs: 60,
            ..sample_config()
        };
        assert!(sweeper_too_eager.validate().is_err());
    }
}
