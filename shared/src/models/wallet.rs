//! Wallet Model

use serde::{Deserialize, Serialize};

use super::transaction::LedgerTransaction;

/// Prepaid balance owned by one client phone number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub id: i64,
    /// Normalized phone (digits only), unique
    pub client_phone: String,
    pub balance: f64,
    /// Set on first successful redemption
    pub activated_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Wallet page projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletView {
    pub wallet: Wallet,
    /// Newest first
    pub recent_transactions: Vec<LedgerTransaction>,
}
