//! Read-only projections: wallet pages and admin reports
//!
//! Every query runs on read transactions only.

use super::codes::normalize_phone;
use super::error::{Entity, LedgerError, LedgerResult};
use super::money::{amounts_match, to_decimal, to_f64};
use super::Ledger;
use rust_decimal::Decimal;
use shared::models::{
    Anomaly, DashboardStats, LedgerTransaction, MenuItem, OrderStatus, ReconciliationReport,
    RecentOrder, TransactionType, Wallet, WalletReconciliation, WalletView,
};
use shared::util::{now_millis, start_of_utc_day};
use std::collections::HashMap;

/// Transactions shown on the wallet page
pub const WALLET_VIEW_TRANSACTIONS: usize = 10;

/// Newest first; ties broken by id
fn sort_newest_first(entries: &mut [LedgerTransaction]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl Ledger {
    /// Wallet page for a client phone
    pub fn wallet_by_phone(&self, phone: &str) -> LedgerResult<WalletView> {
        let phone = normalize_phone(phone)?;
        let wallet_id = self
            .storage
            .wallet_id_by_phone(&phone)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, phone.clone()))?;
        let wallet = self.get_wallet(wallet_id)?;
        let recent_transactions = self.wallet_history(wallet_id, WALLET_VIEW_TRANSACTIONS)?;
        Ok(WalletView {
            wallet,
            recent_transactions,
        })
    }

    pub fn get_wallet(&self, wallet_id: i64) -> LedgerResult<Wallet> {
        self.storage
            .get_wallet(wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(Entity::Wallet, wallet_id.to_string()))
    }

    /// Latest `limit` ledger entries of a wallet, newest first
    pub fn wallet_history(&self, wallet_id: i64, limit: usize) -> LedgerResult<Vec<LedgerTransaction>> {
        let mut entries = self.storage.list_wallet_transactions(wallet_id)?;
        sort_newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    /// Dashboard headline numbers; "today" starts at UTC midnight of `now`
    pub fn dashboard_stats(&self, now: i64) -> LedgerResult<DashboardStats> {
        let today = start_of_utc_day(now);

        let mut total_revenue = Decimal::ZERO;
        let mut today_revenue = Decimal::ZERO;
        for entry in self.storage.list_all_transactions()? {
            if entry.transaction_type != TransactionType::Debit {
                continue;
            }
            let amount = to_decimal(entry.amount).abs();
            total_revenue += amount;
            if entry.created_at >= today {
                today_revenue += amount;
            }
        }

        let mut total_orders = 0u64;
        let mut today_orders = 0u64;
        for order in self.storage.list_orders()? {
            if order.status != OrderStatus::Confirmed {
                continue;
            }
            total_orders += 1;
            if order.resolved_at.unwrap_or(order.created_at) >= today {
                today_orders += 1;
            }
        }

        let active_wallets = self
            .storage
            .list_wallets()?
            .iter()
            .filter(|w| w.activated_at.is_some())
            .count() as u64;
        let low_stock_items = self.low_stock_items()?.len() as u64;

        Ok(DashboardStats {
            total_revenue: to_f64(total_revenue),
            total_orders,
            active_wallets,
            low_stock_items,
            today_revenue: to_f64(today_revenue),
            today_orders,
        })
    }

    /// Latest orders with the client phone resolved
    pub fn recent_orders(&self, limit: usize) -> LedgerResult<Vec<RecentOrder>> {
        let mut orders = self.storage.list_orders()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.truncate(limit);

        let mut phones: HashMap<i64, Option<String>> = HashMap::new();
        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            let client_phone = match phones.get(&order.wallet_id) {
                Some(phone) => phone.clone(),
                None => {
                    let phone = self
                        .storage
                        .get_wallet(order.wallet_id)?
                        .map(|w| w.client_phone);
                    phones.insert(order.wallet_id, phone.clone());
                    phone
                }
            };
            out.push(RecentOrder {
                id: order.id,
                total_amount: order.total_amount,
                status: order.status,
                created_at: order.created_at,
                client_phone,
                staff_id: order.staff_id,
            });
        }
        Ok(out)
    }

    /// Items at or below their low-stock threshold
    pub fn low_stock_items(&self) -> LedgerResult<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self
            .storage
            .list_menu_items()?
            .into_iter()
            .filter(MenuItem::is_low_stock)
            .collect();
        items.sort_by(|a, b| a.stock_quantity.cmp(&b.stock_quantity).then(a.name.cmp(&b.name)));
        Ok(items)
    }

    /// Compare a wallet's balance with the sum of its ledger
    pub fn reconcile_wallet(&self, wallet_id: i64) -> LedgerResult<WalletReconciliation> {
        let wallet = self.get_wallet(wallet_id)?;
        self.reconcile(wallet)
    }

    fn reconcile(&self, wallet: Wallet) -> LedgerResult<WalletReconciliation> {
        let ledger_sum: Decimal = self
            .storage
            .list_wallet_transactions(wallet.id)?
            .iter()
            .map(|e| to_decimal(e.amount))
            .sum();
        let consistent = amounts_match(ledger_sum, to_decimal(wallet.balance));
        if !consistent {
            tracing::error!(
                target: "invariant",
                wallet_id = wallet.id,
                balance = wallet.balance,
                ledger_sum = %ledger_sum,
                "Wallet balance does not match its ledger"
            );
        }
        Ok(WalletReconciliation {
            wallet_id: wallet.id,
            client_phone: wallet.client_phone,
            balance: wallet.balance,
            ledger_sum: to_f64(ledger_sum),
            consistent,
        })
    }

    /// Reconcile every wallet, reporting only the inconsistent ones
    pub fn reconcile_all(&self) -> LedgerResult<ReconciliationReport> {
        let wallets = self.storage.list_wallets()?;
        let wallets_checked = wallets.len() as u64;
        let mut inconsistent = Vec::new();
        for wallet in wallets {
            let row = self.reconcile(wallet)?;
            if !row.consistent {
                inconsistent.push(row);
            }
        }
        Ok(ReconciliationReport {
            wallets_checked,
            inconsistent,
            generated_at: now_millis(),
        })
    }

    /// Recorded anomalies, newest first
    pub fn list_anomalies(&self) -> LedgerResult<Vec<Anomaly>> {
        let mut anomalies = self.storage.list_anomalies()?;
        anomalies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(anomalies)
    }
}
