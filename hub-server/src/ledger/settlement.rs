//! Settlement: confirm, cancel and withdraw
//!
//! ```text
//! pending_confirmation ──confirm──▶ confirmed   (debit + stock + ledger)
//!         │
//!         └──cancel / withdraw / sweep──▶ cancelled   (no ledger effect)
//! ```
//!
//! Terminal states have no outgoing transitions. Every check runs inside the
//! write transaction, so the second of two racing calls always observes the
//! first one's committed result.

use super::codes::token_matches;
use super::error::{Entity, LedgerError, LedgerResult};
use super::money::{to_decimal, to_f64};
use super::storage::StorageError;
use super::Ledger;
use crate::auth::CurrentUser;
use crate::auth::permissions::ORDERS_WITHDRAW;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::models::{
    AnomalyKind, CancelledBy, LedgerTransaction, Order, OrderStatus, TransactionType,
};
use shared::util::{now_millis, snowflake_id};

/// Result of a staff-side withdraw
#[derive(Debug, Clone)]
pub(crate) struct Withdrawal {
    pub order: Order,
    /// false when the order was already cancelled by someone else
    pub changed: bool,
}

impl Ledger {
    /// Client confirms: settle the order atomically
    pub fn confirm_order(&self, order_id: i64, token: &str) -> LedgerResult<Order> {
        let tx_id = snowflake_id();
        let now = now_millis();

        let txn = self.storage.begin_write()?;

        let mut order = self.load_order_txn(&txn, order_id)?;
        self.verify_token_txn(&txn, order_id, token)?;
        if order.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                order_id,
                status: order.status,
            });
        }

        let mut wallet = self
            .storage
            .get_wallet_txn(&txn, order.wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, order.wallet_id.to_string()))?;

        let total = to_decimal(order.total_amount);
        let balance = to_decimal(wallet.balance);
        if balance < total {
            tracing::info!(
                order_id,
                wallet_id = wallet.id,
                balance = wallet.balance,
                total = order.total_amount,
                "Settlement refused, insufficient balance"
            );
            return Err(LedgerError::InsufficientBalance {
                required: order.total_amount,
                available: wallet.balance,
            });
        }
        let new_balance = balance - total;
        if new_balance < Decimal::ZERO {
            // 上面的检查已排除此情况，出现即为不变量被破坏
            drop(txn);
            self.record_standalone_anomaly(
                AnomalyKind::NegativeBalance,
                format!("wallet:{}", wallet.id),
                format!(
                    "settlement would leave balance {} (was {}, order total {})",
                    new_balance, wallet.balance, order.total_amount
                ),
                Some(order_id),
            )?;
            return Err(LedgerError::InsufficientBalance {
                required: order.total_amount,
                available: wallet.balance,
            });
        }

        wallet.balance = to_f64(new_balance);
        wallet.updated_at = now;

        let entry = LedgerTransaction {
            id: tx_id,
            wallet_id: wallet.id,
            order_id: Some(order.id),
            voucher_id: None,
            amount: to_f64(-total),
            transaction_type: TransactionType::Debit,
            description: format!("Order {}", order.id),
            created_at: now,
        };

        for line in self.storage.get_order_items_txn(&txn, order_id)? {
            let Some(mut item) = self.storage.get_menu_item_txn(&txn, line.menu_item_id)? else {
                self.record_anomaly_txn(
                    &txn,
                    AnomalyKind::StockShortfall,
                    format!("menu_item:{}", line.menu_item_id),
                    format!("menu item '{}' missing at settlement", line.name),
                    Some(order_id),
                )?;
                continue;
            };
            if item.stock_quantity < line.quantity {
                self.record_anomaly_txn(
                    &txn,
                    AnomalyKind::StockShortfall,
                    format!("menu_item:{}", item.id),
                    format!(
                        "stock of '{}' was {} but {} were sold, floored at 0",
                        item.name, item.stock_quantity, line.quantity
                    ),
                    Some(order_id),
                )?;
                item.stock_quantity = 0;
            } else {
                item.stock_quantity -= line.quantity;
            }
            item.updated_at = now;
            self.storage.store_menu_item_txn(&txn, &item)?;
        }

        order.status = OrderStatus::Confirmed;
        order.client_confirmed = true;
        order.resolved_at = Some(now);

        self.storage.store_wallet_txn(&txn, &wallet)?;
        self.storage.append_transaction_txn(&txn, &entry)?;
        self.storage.store_order_txn(&txn, &order)?;
        self.storage.clear_pending_txn(&txn, order_id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id,
            wallet_id = wallet.id,
            total = order.total_amount,
            balance = wallet.balance,
            "Order settled"
        );
        self.publish(&order);
        Ok(order)
    }

    /// Client rejects the order
    pub fn cancel_order(
        &self,
        order_id: i64,
        token: &str,
        reason: Option<String>,
    ) -> LedgerResult<Order> {
        let txn = self.storage.begin_write()?;

        let order = self.load_order_txn(&txn, order_id)?;
        self.verify_token_txn(&txn, order_id, token)?;
        if order.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                order_id,
                status: order.status,
            });
        }

        let reason = reason.unwrap_or_else(|| "rejected by client".to_string());
        let order = self.cancel_pending_txn(&txn, order, reason, CancelledBy::Client)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id, "Order rejected by client");
        self.publish(&order);
        Ok(order)
    }

    /// Staff clears the cart for a pending order
    ///
    /// Idempotent on cancelled orders; a confirmed order yields
    /// `ConcurrencyConflict` so the terminal learns the client won.
    pub fn withdraw_order(
        &self,
        user: &CurrentUser,
        order_id: i64,
        reason: Option<String>,
    ) -> LedgerResult<Order> {
        self.authorize(user, ORDERS_WITHDRAW)?;
        let reason = reason.unwrap_or_else(|| "withdrawn by staff".to_string());
        self.withdraw_pending(order_id, reason, CancelledBy::Staff)
            .map(|w| w.order)
    }

    pub(crate) fn withdraw_pending(
        &self,
        order_id: i64,
        reason: String,
        cancelled_by: CancelledBy,
    ) -> LedgerResult<Withdrawal> {
        let txn = self.storage.begin_write()?;
        let order = self.load_order_txn(&txn, order_id)?;

        match order.status {
            OrderStatus::Confirmed => Err(LedgerError::ConcurrencyConflict(order_id)),
            OrderStatus::Cancelled => Ok(Withdrawal {
                order,
                changed: false,
            }),
            OrderStatus::PendingConfirmation => {
                let order = self.cancel_pending_txn(&txn, order, reason, cancelled_by)?;
                txn.commit().map_err(StorageError::from)?;
                tracing::info!(order_id, cancelled_by = ?cancelled_by, "Pending order withdrawn");
                self.publish(&order);
                Ok(Withdrawal {
                    order,
                    changed: true,
                })
            }
        }
    }

    /// pending → cancelled, no ledger or stock effect
    pub(crate) fn cancel_pending_txn(
        &self,
        txn: &WriteTransaction,
        mut order: Order,
        reason: String,
        cancelled_by: CancelledBy,
    ) -> LedgerResult<Order> {
        order.status = OrderStatus::Cancelled;
        order.client_confirmed = false;
        order.resolved_at = Some(now_millis());
        order.cancel_reason = Some(reason);
        order.cancelled_by = Some(cancelled_by);
        self.storage.store_order_txn(txn, &order)?;
        self.storage.clear_pending_txn(txn, order.id)?;
        Ok(order)
    }

    fn load_order_txn(&self, txn: &WriteTransaction, order_id: i64) -> LedgerResult<Order> {
        self.storage
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Order, order_id.to_string()))
    }

    fn verify_token_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        token: &str,
    ) -> LedgerResult<()> {
        match self.storage.get_token_hash_txn(txn, order_id)? {
            Some(hash) if token_matches(token, &hash) => Ok(()),
            _ => {
                crate::security_log!("WARN", "order_token_mismatch", order_id = order_id);
                Err(LedgerError::InvalidToken(order_id))
            }
        }
    }

    /// Persist an anomaly in its own transaction (used after an abort)
    fn record_standalone_anomaly(
        &self,
        kind: AnomalyKind,
        target: String,
        details: String,
        order_id: Option<i64>,
    ) -> LedgerResult<()> {
        let txn = self.storage.begin_write()?;
        self.record_anomaly_txn(&txn, kind, target, details, order_id)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }
}
