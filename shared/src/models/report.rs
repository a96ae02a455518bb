//! Admin Report Models

use serde::{Deserialize, Serialize};

use super::order::OrderStatus;

/// Dashboard headline numbers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    /// Σ |debit| over all time
    pub total_revenue: f64,
    /// Confirmed orders
    pub total_orders: u64,
    /// Wallets with an activation timestamp
    pub active_wallets: u64,
    pub low_stock_items: u64,
    /// Since UTC midnight
    pub today_revenue: f64,
    pub today_orders: u64,
}

/// Row of the recent orders table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentOrder {
    pub id: i64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
    pub client_phone: Option<String>,
    pub staff_id: i64,
}

/// Balance vs ledger sum for one wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletReconciliation {
    pub wallet_id: i64,
    pub client_phone: String,
    pub balance: f64,
    pub ledger_sum: f64,
    pub consistent: bool,
}

/// Reconciliation over all wallets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub wallets_checked: u64,
    pub inconsistent: Vec<WalletReconciliation>,
    pub generated_at: i64,
}
