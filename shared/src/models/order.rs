//! Order Model
//!
//! Orders are built by staff at the POS and settled only after the client
//! confirms on their own device.

use serde::{Deserialize, Serialize};

/// Order status
///
/// `pending_confirmation` → `confirmed` | `cancelled`. Terminal states have
/// no outgoing transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingConfirmation,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::PendingConfirmation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingConfirmation => "pending_confirmation",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Who moved an order to `cancelled`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    /// Client rejected on their device
    Client,
    /// Staff cleared the cart
    Staff,
    /// Confirmation wait expired or the sweeper reclaimed it
    System,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub wallet_id: i64,
    /// Σ(unit_price × quantity) computed at creation
    pub total_amount: f64,
    pub status: OrderStatus,
    pub client_confirmed: bool,
    /// Staff id of the POS operator
    pub staff_id: i64,
    pub notes: Option<String>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancelled_by: Option<CancelledBy>,
}

/// Line item snapshot, immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub order_id: i64,
    /// 0-based position in the cart
    pub line_no: u32,
    pub menu_item_id: i64,
    /// Name at order time
    pub name: String,
    pub quantity: i32,
    /// Price at order time
    pub unit_price: f64,
    pub line_total: f64,
}

/// Cart line sent by the POS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: i64,
    pub quantity: i32,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub wallet_id: i64,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of order creation, handed to the staff terminal
///
/// The raw confirmation token is only ever returned here; the server keeps
/// its SHA-256 hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
    pub confirmation_token: String,
    /// Link rendered as a QR for the client device
    pub confirmation_url: String,
}

/// Order with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}

/// What the client sees on the confirmation page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOrderView {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
    pub wallet_balance: f64,
    pub client_phone: String,
}

/// Client confirm payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirm {
    pub token: String,
}

/// Client cancel payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancel {
    pub token: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Staff withdraw payload (clear cart)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderWithdraw {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Broadcast after every committed status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStatusEvent {
    pub order_id: i64,
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// Outcome of the staff-side confirmation wait
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "order", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    /// Client confirmed and the order settled
    Confirmed(Order),
    /// Client rejected the order
    Rejected(Order),
    /// Wait expired; the order was withdrawn
    TimedOut(Order),
    /// Staff cleared the cart during the wait
    Withdrawn(Order),
}

impl ConfirmationOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ConfirmationOutcome::Confirmed(o)
            | ConfirmationOutcome::Rejected(o)
            | ConfirmationOutcome::TimedOut(o)
            | ConfirmationOutcome::Withdrawn(o) => o,
        }
    }
}
