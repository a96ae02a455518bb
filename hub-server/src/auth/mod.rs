//! 认证授权模块
//!
//! 提供员工登录、JWT 认证、权限管理和中间件：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前员工会话
//! - [`StaffRoster`] - 员工名单 (argon2 一次性口令)
//! - [`require_auth`] - 认证中间件
//! - [`require_permission`] - 权限检查中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod permissions;
pub mod roster;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{is_public_api_route, require_auth, require_permission};
pub use roster::{RosterError, StaffRoster, hash_otp, verify_otp};
