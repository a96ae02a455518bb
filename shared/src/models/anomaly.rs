//! Anomaly Model

use serde::{Deserialize, Serialize};

/// Invariant violation kinds recorded by settlement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Stock would have gone negative; floored at zero
    StockShortfall,
    /// A wallet debit would have gone below zero
    NegativeBalance,
}

/// Append-only anomaly record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub id: i64,
    pub kind: AnomalyKind,
    /// e.g. `menu_item:42`
    pub target: String,
    pub details: String,
    pub order_id: Option<i64>,
    pub created_at: i64,
}
