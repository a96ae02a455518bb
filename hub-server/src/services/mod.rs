//! 服务层
//!
//! - [`https`] - 路由装配与 HTTP 中间件

pub mod https;

pub use https::{build_app, build_router};
