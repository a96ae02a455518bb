//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 员工登录
//! - [`vouchers`] - 代金券发行与兑换
//! - [`wallets`] - 钱包查询
//! - [`menu`] - 菜单管理
//! - [`orders`] - 员工端订单 (下单、等待确认、撤单)
//! - [`public_orders`] - 客户确认页 (凭确认令牌访问)
//! - [`reports`] - 管理报表

pub mod auth;
pub mod health;
pub mod menu;
pub mod orders;
pub mod public_orders;
pub mod reports;
pub mod vouchers;
pub mod wallets;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
