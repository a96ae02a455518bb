//! Staff Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Staff role from the venue roster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Issues vouchers at the entrance
    Teller,
    Barman,
    Waiter,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Teller => "teller",
            StaffRole::Barman => "barman",
            StaffRole::Waiter => "waiter",
            StaffRole::Admin => "admin",
        }
    }
}

/// Roster entry as stored in the roster file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub role: StaffRole,
    /// argon2 PHC string of the one-time code
    pub otp_hash: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Staff info returned to clients (no secrets)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffInfo {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub role: StaffRole,
    pub permissions: Vec<String>,
}

/// Login payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 6, max = 32))]
    pub phone: String,
    #[validate(length(min = 4, max = 32))]
    pub otp: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: StaffInfo,
}
