//! Menu Item Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Fixed menu sections shown on the POS and the public menu
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MenuCategory {
    Beers,
    Ciders,
    Cocktails,
    Shots,
    Liqueurs,
    Bottles,
    Food,
}

impl MenuCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuCategory::Beers => "beers",
            MenuCategory::Ciders => "ciders",
            MenuCategory::Cocktails => "cocktails",
            MenuCategory::Shots => "shots",
            MenuCategory::Liqueurs => "liqueurs",
            MenuCategory::Bottles => "bottles",
            MenuCategory::Food => "food",
        }
    }
}

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: MenuCategory,
    pub stock_quantity: i32,
    /// Low-stock threshold for the admin dashboard
    pub min_stock_alert: i32,
    /// Manual flag, independent of stock
    pub is_available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MenuItem {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_alert
    }
}

/// Create menu item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuItemCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub price: f64,
    pub category: MenuCategory,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub min_stock_alert: Option<i32>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

/// Update menu item payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MenuItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    pub price: Option<f64>,
    pub category: Option<MenuCategory>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock_alert: Option<i32>,
    pub is_available: Option<bool>,
}
