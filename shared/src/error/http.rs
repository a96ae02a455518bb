//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::VoucherNotFound
            | Self::OrderNotFound
            | Self::WalletNotFound
            | Self::MenuItemNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (lost a race or the record is already final)
            Self::VoucherAlreadyRedeemed
            | Self::OrderAlreadyTerminal
            | Self::OrderConcurrencyConflict => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied
            | Self::OrderTokenInvalid => StatusCode::FORBIDDEN,

            // 402 Payment Required
            Self::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,

            // 422 Unprocessable (business rule on current catalog state)
            Self::InsufficientStock | Self::MenuItemUnavailable | Self::OrderEmpty => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::TimeoutError | Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::StorageFull
            | Self::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
