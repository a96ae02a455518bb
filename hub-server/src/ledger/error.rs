use super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Kinds of record a lookup can miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Voucher,
    Wallet,
    Order,
    MenuItem,
}

impl Entity {
    fn error_code(self) -> ErrorCode {
        match self {
            Entity::Voucher => ErrorCode::VoucherNotFound,
            Entity::Wallet => ErrorCode::WalletNotFound,
            Entity::Order => ErrorCode::OrderNotFound,
            Entity::MenuItem => ErrorCode::MenuItemNotFound,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Voucher => "Voucher",
            Entity::Wallet => "Wallet",
            Entity::Order => "Order",
            Entity::MenuItem => "Menu item",
        };
        f.write_str(name)
    }
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0} not found: {1}")]
    NotFound(Entity, String),

    #[error("Voucher already redeemed: {0}")]
    AlreadyRedeemed(String),

    #[error("Order {order_id} is already {}", status.as_str())]
    AlreadyTerminal { order_id: i64, status: OrderStatus },

    #[error("Insufficient balance: required {required:.2}, available {available:.2}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("Insufficient stock for '{name}' ({reason}): requested {requested}, available {available}")]
    InsufficientStock {
        menu_item_id: i64,
        name: String,
        requested: i32,
        available: i32,
        /// `"insufficient"` or `"unavailable"`
        reason: &'static str,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid confirmation token for order {0}")]
    InvalidToken(i64),

    #[error("Order {0} was settled concurrently")]
    ConcurrencyConflict(i64),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) = e {
        return ErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙
    ErrorCode::SystemBusy
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::new(code)
            }
            LedgerError::NotFound(entity, key) => {
                AppError::with_message(entity.error_code(), format!("{entity} not found: {key}"))
            }
            LedgerError::AlreadyRedeemed(code) => {
                AppError::new(ErrorCode::VoucherAlreadyRedeemed).with_detail("code", code)
            }
            LedgerError::AlreadyTerminal { order_id, status } => {
                AppError::new(ErrorCode::OrderAlreadyTerminal)
                    .with_detail("order_id", order_id)
                    .with_detail("status", status.as_str())
            }
            LedgerError::InsufficientBalance {
                required,
                available,
            } => AppError::new(ErrorCode::InsufficientBalance)
                .with_detail("required", required)
                .with_detail("available", available),
            LedgerError::InsufficientStock {
                menu_item_id,
                name,
                requested,
                available,
                reason,
            } => {
                let (code, message) = if reason == "unavailable" {
                    (ErrorCode::MenuItemUnavailable, format!("{name} is not available"))
                } else {
                    (ErrorCode::InsufficientStock, format!("Insufficient stock for {name}"))
                };
                AppError::with_message(code, message)
                    .with_detail("menu_item_id", menu_item_id)
                    .with_detail("requested", requested)
                    .with_detail("available", available)
                    .with_detail("reason", reason)
            }
            LedgerError::EmptyCart => AppError::new(ErrorCode::OrderEmpty),
            LedgerError::Validation(msg) => AppError::validation(msg),
            LedgerError::InvalidPhone(msg) => AppError::with_message(ErrorCode::InvalidPhone, msg),
            LedgerError::Forbidden(msg) => AppError::forbidden(msg),
            LedgerError::InvalidToken(_) => AppError::new(ErrorCode::OrderTokenInvalid),
            LedgerError::ConcurrencyConflict(order_id) => {
                AppError::new(ErrorCode::OrderConcurrencyConflict).with_detail("order_id", order_id)
            }
            LedgerError::Persistence(msg) => AppError::database(msg),
            LedgerError::Internal(msg) => AppError::internal(msg),
        }
    }
}
