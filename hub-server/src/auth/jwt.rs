//! JWT 令牌服务
//!
//! 处理员工会话令牌的生成、验证和解析。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_SECRET_LEN: usize = 32;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl JwtConfig {
    /// 从环境变量加载
    ///
    /// `JWT_SECRET` 未设置时：debug 构建生成临时密钥，release 构建报错。
    pub fn from_env() -> Result<Self, JwtError> {
        Ok(Self::with_secret(load_jwt_secret()?))
    }

    /// 随机临时密钥 (重启后会话失效)
    pub fn ephemeral() -> Result<Self, JwtError> {
        Ok(Self::with_secret(generate_secure_printable_jwt_secret()?))
    }

    /// 指定密钥，其他参数取自环境变量
    pub fn with_secret(secret: String) -> Self {
        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(720), // 默认 12 小时 (一个营业班次)
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "hub-server".to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "hub-staff".to_string()),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 员工 ID (Subject)
    pub sub: String,
    /// 员工姓名
    pub username: String,
    /// 角色名称
    pub role: String,
    /// 权限列表 (逗号分隔)
    pub permissions: String,
    /// 令牌类型
    pub token_type: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("密钥生成失败: {0}")]
    KeyGenerationFailed(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// 生成可打印的安全 JWT 密钥 (64 字符)
pub fn generate_secure_printable_jwt_secret() -> Result<String, JwtError> {
    const ALLOWED: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}|;:,.<>?";

    let mut bytes = [0u8; 64];
    SystemRandom::new().fill(&mut bytes).map_err(|_| {
        JwtError::KeyGenerationFailed("Failed to generate secure random key".to_string())
    })?;

    Ok(bytes
        .iter()
        .map(|b| ALLOWED[(*b as usize) % ALLOWED.len()] as char)
        .collect())
}

/// 从环境变量安全地加载 JWT 密钥
fn load_jwt_secret() -> Result<String, JwtError> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            if secret.len() < MIN_SECRET_LEN {
                return Err(JwtError::ConfigError(format!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_SECRET_LEN
                )));
            }
            Ok(secret)
        }
        Err(_) => {
            #[cfg(debug_assertions)]
            {
                tracing::warn!(
                    "⚠️  JWT_SECRET not set! Generating temporary key, sessions will not survive a restart."
                );
                generate_secure_printable_jwt_secret()
            }
            #[cfg(not(debug_assertions))]
            {
                Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production!".to_string(),
                ))
            }
        }
    }
}

/// JWT 令牌服务
#[derive(Debug, Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// 使用指定配置创建 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为员工生成新令牌
    pub fn generate_token(
        &self,
        user_id: &str,
        username: &str,
        role: &str,
        permissions: &[String],
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            permissions: permissions.join(","),
            token_type: "access".to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }

    /// 令牌有效期 (秒)
    pub fn expires_in_seconds(&self) -> i64 {
        self.config.expiration_minutes * 60
    }
}

/// 当前员工会话 (从 JWT Claims 解析)
///
/// 由认证中间件创建，注入到请求处理函数；每个需要授权的账本操作
/// 都会接收它并在服务内部再次检查权限。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// 员工 ID
    pub id: i64,
    /// 员工姓名
    pub username: String,
    /// 角色名称
    pub role: String,
    /// 权限列表
    pub permissions: Vec<String>,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| JwtError::InvalidToken(format!("invalid subject: {}", claims.sub)))?;

        let permissions = if claims.permissions.is_empty() {
            vec![]
        } else {
            claims
                .permissions
                .split(',')
                .map(|s| s.to_string())
                .collect()
        };

        Ok(Self {
            id,
            username: claims.username,
            role: claims.role,
            permissions,
        })
    }
}

impl CurrentUser {
    /// 是否管理员
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// 检查是否拥有指定权限
    ///
    /// 1. 管理员拥有所有权限
    /// 2. 权限列表包含 `"all"` 则拥有所有权限
    /// 3. 精确匹配或前缀匹配 (`orders:*`)
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin() {
            return true;
        }

        self.permissions.iter().any(|p| {
            if p == "all" || p == permission {
                return true;
            }
            match p.strip_suffix(":*") {
                Some(prefix) => permission
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(':')),
                None => false,
            }
        })
    }

    /// 检查是否拥有任一指定权限
    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig::ephemeral().unwrap())
    }

    fn staff(role: &str, permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 7,
            username: "Marta".to_string(),
            role: role.to_string(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = service();
        let permissions = vec!["orders:create".to_string(), "orders:withdraw".to_string()];

        let token = service
            .generate_token("7", "Marta", "barman", &permissions)
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "barman");
        assert_eq!(claims.permissions, "orders:create,orders:withdraw");

        let user = CurrentUser::try_from(claims).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.permissions.len(), 2);
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let issuer = service();
        let verifier = service();
        let token = issuer.generate_token("1", "a", "teller", &[]).unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::with_config(JwtConfig {
            expiration_minutes: -10,
            ..JwtConfig::ephemeral().unwrap()
        });
        let token = service.generate_token("1", "a", "teller", &[]).unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let service = service();
        let token = service.generate_token("abc", "a", "teller", &[]).unwrap();
        let claims = service.validate_token(&token).unwrap();
        assert!(CurrentUser::try_from(claims).is_err());
    }

    #[test]
    fn test_current_user_permissions() {
        let user = staff("waiter", &["orders:*"]);
        assert!(user.has_permission("orders:create"));
        assert!(user.has_permission("orders:withdraw"));
        assert!(!user.has_permission("ordersx:create"));
        assert!(!user.has_permission("vouchers:issue"));
        assert!(user.has_any_permission(&["vouchers:issue", "orders:create"]));
    }

    #[test]
    fn test_admin_has_all_permissions() {
        let admin = staff("admin", &[]);
        assert!(admin.is_admin());
        assert!(admin.has_permission("menu:manage"));
        assert!(admin.has_permission("vouchers:issue"));

        let all = staff("teller", &["all"]);
        assert!(all.has_permission("reports:view"));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }

    #[test]
    fn test_printable_secret() {
        let a = generate_secure_printable_jwt_secret().unwrap();
        let b = generate_secure_printable_jwt_secret().unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
