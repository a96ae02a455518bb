//! Data models
//!
//! Shared between hub-server and its clients (via API).
//! All IDs are snowflake `i64`, timestamps are UTC milliseconds,
//! money is `f64` with two decimal places.

pub mod anomaly;
pub mod menu_item;
pub mod order;
pub mod report;
pub mod staff;
pub mod transaction;
pub mod voucher;
pub mod wallet;

// Re-exports
pub use anomaly::*;
pub use menu_item::*;
pub use order::*;
pub use report::*;
pub use staff::*;
pub use transaction::*;
pub use voucher::*;
pub use wallet::*;
