//! Menu catalog

use super::error::{Entity, LedgerError, LedgerResult};
use super::money::{require_finite, round_money};
use super::storage::StorageError;
use super::Ledger;
use crate::auth::CurrentUser;
use crate::auth::permissions::MENU_MANAGE;
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};
use shared::util::{now_millis, snowflake_id};
use validator::Validate;

/// Default low-stock threshold for new items
pub const DEFAULT_MIN_STOCK_ALERT: i32 = 5;

fn validation_error(errors: validator::ValidationErrors) -> LedgerError {
    LedgerError::Validation(errors.to_string())
}

impl Ledger {
    /// Public menu: available items sorted by name
    pub fn list_available_menu(&self) -> LedgerResult<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self
            .storage
            .list_menu_items()?
            .into_iter()
            .filter(|item| item.is_available)
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Admin menu: all items by category, then name
    pub fn list_all_menu(&self) -> LedgerResult<Vec<MenuItem>> {
        let mut items = self.storage.list_menu_items()?;
        items.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(items)
    }

    pub fn get_menu_item(&self, menu_item_id: i64) -> LedgerResult<MenuItem> {
        self.storage
            .get_menu_item(menu_item_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::MenuItem, menu_item_id.to_string()))
    }

    pub fn create_menu_item(
        &self,
        user: &CurrentUser,
        input: MenuItemCreate,
    ) -> LedgerResult<MenuItem> {
        self.authorize(user, MENU_MANAGE)?;
        input.validate().map_err(validation_error)?;
        require_finite(input.price, "price")?;

        let now = now_millis();
        let item = MenuItem {
            id: snowflake_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: round_money(input.price),
            category: input.category,
            stock_quantity: input.stock_quantity,
            min_stock_alert: input.min_stock_alert.unwrap_or(DEFAULT_MIN_STOCK_ALERT),
            is_available: input.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        self.storage.store_menu_item_txn(&txn, &item)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(menu_item_id = item.id, name = %item.name, "Menu item created");
        Ok(item)
    }

    pub fn update_menu_item(
        &self,
        user: &CurrentUser,
        menu_item_id: i64,
        input: MenuItemUpdate,
    ) -> LedgerResult<MenuItem> {
        self.authorize(user, MENU_MANAGE)?;
        input.validate().map_err(validation_error)?;
        if let Some(price) = input.price {
            require_finite(price, "price")?;
        }

        let txn = self.storage.begin_write()?;
        let mut item = self
            .storage
            .get_menu_item_txn(&txn, menu_item_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::MenuItem, menu_item_id.to_string()))?;

        if let Some(name) = input.name {
            item.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            item.description = Some(description);
        }
        if let Some(price) = input.price {
            item.price = round_money(price);
        }
        if let Some(category) = input.category {
            item.category = category;
        }
        if let Some(stock) = input.stock_quantity {
            item.stock_quantity = stock;
        }
        if let Some(threshold) = input.min_stock_alert {
            item.min_stock_alert = threshold;
        }
        if let Some(available) = input.is_available {
            item.is_available = available;
        }
        item.updated_at = now_millis();

        self.storage.store_menu_item_txn(&txn, &item)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(menu_item_id, "Menu item updated");
        Ok(item)
    }
}
