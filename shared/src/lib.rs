//! Shared types for the venue hub
//!
//! Domain models, the unified error system and id/time utilities used by
//! hub-server and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
