//! Ledger Transaction Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Voucher redemption
    Credit,
    /// Order settlement
    Debit,
}

/// Append-only wallet ledger entry
///
/// `amount` is signed: credits are positive, debits negative. The sum of a
/// wallet's entries always equals its balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub order_id: Option<i64>,
    pub voucher_id: Option<i64>,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub description: String,
    pub created_at: i64,
}
