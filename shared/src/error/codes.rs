//! Unified error codes for the venue hub
//!
//! This module defines all error codes used across hub-server and its clients
//! (staff terminal, client device, admin dashboard).
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Voucher errors
//! - 4xxx: Order errors
//! - 5xxx: Wallet errors
//! - 6xxx: Menu errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (phone/one-time code)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Voucher ====================
    /// Voucher not found
    VoucherNotFound = 3001,
    /// Voucher has already been used or voided
    VoucherAlreadyRedeemed = 3002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is already confirmed or cancelled
    OrderAlreadyTerminal = 4002,
    /// Cart is empty
    OrderEmpty = 4003,
    /// Confirmation token does not match the order
    OrderTokenInvalid = 4004,
    /// Lost a race for the order's status transition
    OrderConcurrencyConflict = 4005,

    // ==================== 5xxx: Wallet ====================
    /// Wallet not found
    WalletNotFound = 5001,
    /// Wallet balance is lower than the order total
    InsufficientBalance = 5002,
    /// Phone number is invalid
    InvalidPhone = 5003,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Requested quantity exceeds stock
    InsufficientStock = 6003,
    /// Menu item is marked unavailable
    MenuItemUnavailable = 6004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,

    // ==================== 94xx: Storage ====================
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid phone number or code",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Voucher
            ErrorCode::VoucherNotFound => "Voucher not found",
            ErrorCode::VoucherAlreadyRedeemed => "Voucher has already been used",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyTerminal => "Order has already been confirmed or cancelled",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::OrderTokenInvalid => "Confirmation link is not valid for this order",
            ErrorCode::OrderConcurrencyConflict => "Order was already settled elsewhere",

            // Wallet
            ErrorCode::WalletNotFound => "Wallet not found",
            ErrorCode::InsufficientBalance => "Insufficient wallet balance",
            ErrorCode::InvalidPhone => "Invalid phone number",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",

            // Storage
            ErrorCode::StorageFull => "Storage full (disk space insufficient)",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Voucher
            3001 => Ok(ErrorCode::VoucherNotFound),
            3002 => Ok(ErrorCode::VoucherAlreadyRedeemed),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyTerminal),
            4003 => Ok(ErrorCode::OrderEmpty),
            4004 => Ok(ErrorCode::OrderTokenInvalid),
            4005 => Ok(ErrorCode::OrderConcurrencyConflict),

            // Wallet
            5001 => Ok(ErrorCode::WalletNotFound),
            5002 => Ok(ErrorCode::InsufficientBalance),
            5003 => Ok(ErrorCode::InvalidPhone),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6003 => Ok(ErrorCode::InsufficientStock),
            6004 => Ok(ErrorCode::MenuItemUnavailable),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
