//! Voucher Model

use serde::{Deserialize, Serialize};

/// Voucher lifecycle: `active` → `used` | `voided` (both terminal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    Active,
    Used,
    Voided,
}

impl VoucherStatus {
    pub fn is_redeemable(&self) -> bool {
        matches!(self, VoucherStatus::Active)
    }
}

/// Single-use prepaid credential, printed as a QR code by a teller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voucher {
    pub id: i64,
    /// Redemption code encoded in the QR (`SPOT-XXXX-XXXX-XXXX`)
    pub code: String,
    pub face_value: f64,
    pub status: VoucherStatus,
    /// Staff id of the issuing teller
    pub issued_by: i64,
    pub issued_at: i64,
    /// Normalized phone of the redeeming client
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<i64>,
    #[serde(default)]
    pub voided_at: Option<i64>,
}

/// What an anonymous scanner may see before redeeming
///
/// Never carries the code or the redeeming phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoucherPreview {
    pub face_value: f64,
    pub status: VoucherStatus,
    pub issued_at: i64,
}

impl From<&Voucher> for VoucherPreview {
    fn from(voucher: &Voucher) -> Self {
        Self {
            face_value: voucher.face_value,
            status: voucher.status,
            issued_at: voucher.issued_at,
        }
    }
}

/// Issue voucher payload (face value falls back to the configured default)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherIssue {
    #[serde(default)]
    pub face_value: Option<f64>,
}

/// Void voucher payload (lost or misprinted QR)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherVoid {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Redeem voucher payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherRedeem {
    pub phone: String,
}
