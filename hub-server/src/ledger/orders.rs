//! Order creation and lookups

use super::codes::{generate_token, hash_token, token_matches};
use super::error::{Entity, LedgerError, LedgerResult};
use super::money::{line_total, to_decimal, to_f64, validate_quantity};
use super::storage::StorageError;
use super::Ledger;
use crate::auth::CurrentUser;
use crate::auth::permissions::ORDERS_CREATE;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use rust_decimal::Decimal;
use shared::models::{
    CartLine, ClientOrderView, Order, OrderCreate, OrderDetail, OrderLineItem, OrderStatus,
    PendingOrder,
};
use shared::util::{now_millis, snowflake_id};
use std::collections::HashMap;

/// Merge duplicate menu items, keeping first-seen order
fn merge_cart_lines(items: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(items.len());
    let mut index: HashMap<i64, usize> = HashMap::new();
    for line in items {
        match index.get(&line.menu_item_id) {
            Some(&pos) => merged[pos].quantity = merged[pos].quantity.saturating_add(line.quantity),
            None => {
                index.insert(line.menu_item_id, merged.len());
                merged.push(line.clone());
            }
        }
    }
    merged
}

impl Ledger {
    /// Create a pending order for a wallet
    ///
    /// Stock and balance checks here are advisory; settlement re-checks both
    /// inside its own transaction.
    pub fn create_order(&self, user: &CurrentUser, input: OrderCreate) -> LedgerResult<PendingOrder> {
        self.authorize(user, ORDERS_CREATE)?;

        if input.items.is_empty() {
            return Err(LedgerError::EmptyCart);
        }
        validate_optional_text(&input.notes, "notes", MAX_NOTE_LEN)
            .map_err(|e| LedgerError::Validation(e.message))?;
        for line in &input.items {
            validate_quantity(line.quantity)?;
        }
        let lines = merge_cart_lines(&input.items);
        for line in &lines {
            validate_quantity(line.quantity)?;
        }

        let order_id = snowflake_id();
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let now = now_millis();

        let txn = self.storage.begin_write()?;

        let wallet = self
            .storage
            .get_wallet_txn(&txn, input.wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, input.wallet_id.to_string()))?;

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;
        for (line_no, line) in lines.iter().enumerate() {
            let menu_item = self
                .storage
                .get_menu_item_txn(&txn, line.menu_item_id)?
                .ok_or_else(|| {
                    LedgerError::NotFound(Entity::MenuItem, line.menu_item_id.to_string())
                })?;

            if !menu_item.is_available {
                return Err(LedgerError::InsufficientStock {
                    menu_item_id: menu_item.id,
                    name: menu_item.name,
                    requested: line.quantity,
                    available: menu_item.stock_quantity,
                    reason: "unavailable",
                });
            }
            if menu_item.stock_quantity < line.quantity {
                return Err(LedgerError::InsufficientStock {
                    menu_item_id: menu_item.id,
                    name: menu_item.name,
                    requested: line.quantity,
                    available: menu_item.stock_quantity,
                    reason: "insufficient",
                });
            }

            let amount = line_total(menu_item.price, line.quantity);
            total += amount;
            items.push(OrderLineItem {
                order_id,
                line_no: line_no as u32,
                menu_item_id: menu_item.id,
                name: menu_item.name,
                quantity: line.quantity,
                unit_price: menu_item.price,
                line_total: to_f64(amount),
            });
        }

        let total_amount = to_f64(total);
        if to_decimal(wallet.balance) < total {
            return Err(LedgerError::InsufficientBalance {
                required: total_amount,
                available: wallet.balance,
            });
        }

        let order = Order {
            id: order_id,
            wallet_id: wallet.id,
            total_amount,
            status: OrderStatus::PendingConfirmation,
            client_confirmed: false,
            staff_id: user.id,
            notes: input.notes,
            created_at: now,
            resolved_at: None,
            cancel_reason: None,
            cancelled_by: None,
        };

        self.storage.store_order_txn(&txn, &order)?;
        self.storage.store_order_items_txn(&txn, &items)?;
        self.storage.store_token_hash_txn(&txn, order.id, &token_hash)?;
        self.storage.mark_pending_txn(&txn, order.id, now)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = order.id,
            wallet_id = order.wallet_id,
            total = order.total_amount,
            lines = items.len(),
            staff_id = user.id,
            "Order created, awaiting client confirmation"
        );
        self.publish(&order);

        let confirmation_url = format!(
            "{}/confirm-order?id={}&token={}",
            self.settings.public_base_url.trim_end_matches('/'),
            order.id,
            token
        );
        Ok(PendingOrder {
            order,
            items,
            confirmation_token: token,
            confirmation_url,
        })
    }

    pub fn get_order(&self, order_id: i64) -> LedgerResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Order, order_id.to_string()))
    }

    /// Order header plus line items
    pub fn get_order_detail(&self, order_id: i64) -> LedgerResult<OrderDetail> {
        let order = self.get_order(order_id)?;
        let items = self.storage.get_order_items(order_id)?;
        Ok(OrderDetail { order, items })
    }

    /// What the client device shows before confirming
    pub fn client_order_view(&self, order_id: i64, token: &str) -> LedgerResult<ClientOrderView> {
        let order = self.get_order(order_id)?;
        self.verify_token(order_id, token)?;
        let wallet = self
            .storage
            .get_wallet(order.wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, order.wallet_id.to_string()))?;
        let items = self.storage.get_order_items(order_id)?;
        Ok(ClientOrderView {
            order,
            items,
            wallet_balance: wallet.balance,
            client_phone: wallet.client_phone,
        })
    }

    fn verify_token(&self, order_id: i64, token: &str) -> LedgerResult<()> {
        match self.storage.get_token_hash(order_id)? {
            Some(hash) if token_matches(token, &hash) => Ok(()),
            _ => Err(LedgerError::InvalidToken(order_id)),
        }
    }
}
