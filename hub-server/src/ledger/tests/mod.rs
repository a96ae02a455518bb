use super::*;
use crate::auth::permissions::get_default_permissions;
use shared::models::{
    CartLine, MenuCategory, MenuItem, MenuItemCreate, OrderCreate, OrderStatus, PendingOrder,
    StaffRole, TransactionType, VoucherPreview, VoucherStatus, Wallet,
};

mod test_handshake;
mod test_sweeper;

const TEST_PHONE: &str = "841234567";

fn create_test_ledger() -> Ledger {
    let storage = LedgerStorage::open_in_memory().unwrap();
    Ledger::from_storage(storage, LedgerSettings::default())
}

fn create_shared_ledger() -> Arc<Ledger> {
    Arc::new(create_test_ledger())
}

fn staff(id: i64, role: StaffRole) -> CurrentUser {
    CurrentUser {
        id,
        username: format!("{} {}", role.as_str(), id),
        role: role.as_str().to_string(),
        permissions: get_default_permissions(role),
    }
}

fn teller() -> CurrentUser {
    staff(1, StaffRole::Teller)
}

fn barman() -> CurrentUser {
    staff(2, StaffRole::Barman)
}

fn admin() -> CurrentUser {
    staff(3, StaffRole::Admin)
}

// ========================================================================
// Helper: seed menu items and funded wallets
// ========================================================================

fn seed_menu_item(ledger: &Ledger, name: &str, price: f64, stock: i32) -> MenuItem {
    ledger
        .create_menu_item(
            &admin(),
            MenuItemCreate {
                name: name.to_string(),
                description: None,
                price,
                category: MenuCategory::Cocktails,
                stock_quantity: stock,
                min_stock_alert: Some(2),
                is_available: None,
            },
        )
        .unwrap()
}

/// Issue a voucher of `amount` and redeem it into `phone`
fn funded_wallet(ledger: &Ledger, phone: &str, amount: f64) -> Wallet {
    let voucher = ledger.issue_voucher(&teller(), Some(amount)).unwrap();
    ledger.redeem_voucher(&voucher.code, phone).unwrap()
}

fn line(menu_item_id: i64, quantity: i32) -> CartLine {
    CartLine {
        menu_item_id,
        quantity,
    }
}

fn place_order(ledger: &Ledger, wallet_id: i64, items: Vec<CartLine>) -> PendingOrder {
    ledger
        .create_order(
            &barman(),
            OrderCreate {
                wallet_id,
                items,
                notes: None,
            },
        )
        .unwrap()
}
