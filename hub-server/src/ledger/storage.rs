//! redb-based storage layer for the venue ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `vouchers` | `voucher_id` | `Voucher` | Issued vouchers |
//! | `voucher_codes` | `code` | `voucher_id` | Unique QR code index |
//! | `wallets` | `wallet_id` | `Wallet` | Client wallets |
//! | `wallet_phones` | `phone` | `wallet_id` | One wallet per normalized phone |
//! | `orders` | `order_id` | `Order` | Order headers |
//! | `order_items` | `(order_id, line_no)` | `OrderLineItem` | Immutable line snapshots |
//! | `order_tokens` | `order_id` | sha256 hex | Confirmation token hashes |
//! | `pending_orders` | `order_id` | `created_at` | Orders awaiting the client |
//! | `menu_items` | `menu_item_id` | `MenuItem` | Catalog and stock |
//! | `transactions` | `(wallet_id, tx_id)` | `LedgerTransaction` | Append-only wallet ledger |
//! | `anomalies` | `anomaly_id` | `Anomaly` | Recorded invariant breaches |
//!
//! # Transactions
//!
//! redb allows a single write transaction at a time, so every mutating
//! operation in the ledger is serialized by [`LedgerStorage::begin_write`].
//! The `*_txn` helpers open a table, touch it and drop it again, so callers can
//! chain them freely inside one transaction.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Anomaly, LedgerTransaction, MenuItem, Order, OrderLineItem, Voucher, Wallet,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for vouchers: key = voucher_id, value = JSON-serialized Voucher
const VOUCHERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("vouchers");

/// Unique code index: key = normalized code, value = voucher_id
const VOUCHER_CODES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("voucher_codes");

/// Table for wallets: key = wallet_id, value = JSON-serialized Wallet
const WALLETS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("wallets");

/// Phone index: key = normalized phone, value = wallet_id
const WALLET_PHONES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("wallet_phones");

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Table for line items: key = (order_id, line_no), value = JSON-serialized OrderLineItem
const ORDER_ITEMS_TABLE: TableDefinition<(i64, u32), &[u8]> = TableDefinition::new("order_items");

/// Confirmation token hashes: key = order_id, value = sha256 hex
/// 只保存哈希，原始 token 仅在创建订单时返回一次
const ORDER_TOKENS_TABLE: TableDefinition<i64, &str> = TableDefinition::new("order_tokens");

/// Pending order index: key = order_id, value = created_at (millis)
const PENDING_ORDERS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("pending_orders");

/// Table for menu items: key = menu_item_id, value = JSON-serialized MenuItem
const MENU_ITEMS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("menu_items");

/// Wallet ledger: key = (wallet_id, tx_id), value = JSON-serialized LedgerTransaction
const TRANSACTIONS_TABLE: TableDefinition<(i64, i64), &[u8]> =
    TableDefinition::new("transactions");

/// Table for anomalies: key = anomaly_id, value = JSON-serialized Anomaly
const ANOMALIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("anomalies");

type JsonTable = TableDefinition<'static, i64, &'static [u8]>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Row counts per table
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub vouchers: u64,
    pub wallets: u64,
    pub orders: u64,
    pub pending_orders: u64,
    pub menu_items: u64,
    pub transactions: u64,
    pub anomalies: u64,
}

/// Ledger storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for LedgerStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStorage").finish_non_exhaustive()
    }
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns, the write survives a power cut.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn init_tables(db: &Database) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(VOUCHERS_TABLE)?;
            let _ = write_txn.open_table(VOUCHER_CODES_TABLE)?;
            let _ = write_txn.open_table(WALLETS_TABLE)?;
            let _ = write_txn.open_table(WALLET_PHONES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(ORDER_TOKENS_TABLE)?;
            let _ = write_txn.open_table(PENDING_ORDERS_TABLE)?;
            let _ = write_txn.open_table(MENU_ITEMS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(ANOMALIES_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Generic JSON helpers ==========

    fn read_json<T: DeserializeOwned>(&self, def: JsonTable, id: i64) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn read_json_txn<T: DeserializeOwned>(
        txn: &WriteTransaction,
        def: JsonTable,
        id: i64,
    ) -> StorageResult<Option<T>> {
        let table = txn.open_table(def)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn write_json_txn<T: Serialize>(
        txn: &WriteTransaction,
        def: JsonTable,
        id: i64,
        value: &T,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)?;
        let mut table = txn.open_table(def)?;
        table.insert(id, bytes.as_slice())?;
        Ok(())
    }

    fn scan_json<T: DeserializeOwned>(&self, def: JsonTable) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    // ========== Voucher Operations ==========

    pub fn get_voucher(&self, voucher_id: i64) -> StorageResult<Option<Voucher>> {
        self.read_json(VOUCHERS_TABLE, voucher_id)
    }

    pub fn get_voucher_txn(
        &self,
        txn: &WriteTransaction,
        voucher_id: i64,
    ) -> StorageResult<Option<Voucher>> {
        Self::read_json_txn(txn, VOUCHERS_TABLE, voucher_id)
    }

    pub fn voucher_id_by_code(&self, code: &str) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VOUCHER_CODES_TABLE)?;
        Ok(table.get(code)?.map(|guard| guard.value()))
    }

    pub fn voucher_id_by_code_txn(
        &self,
        txn: &WriteTransaction,
        code: &str,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(VOUCHER_CODES_TABLE)?;
        Ok(table.get(code)?.map(|guard| guard.value()))
    }

    /// Store a voucher and (re)index its code
    pub fn store_voucher_txn(&self, txn: &WriteTransaction, voucher: &Voucher) -> StorageResult<()> {
        Self::write_json_txn(txn, VOUCHERS_TABLE, voucher.id, voucher)?;
        let mut codes = txn.open_table(VOUCHER_CODES_TABLE)?;
        codes.insert(voucher.code.as_str(), voucher.id)?;
        Ok(())
    }

    pub fn list_vouchers(&self) -> StorageResult<Vec<Voucher>> {
        self.scan_json(VOUCHERS_TABLE)
    }

    // ========== Wallet Operations ==========

    pub fn get_wallet(&self, wallet_id: i64) -> StorageResult<Option<Wallet>> {
        self.read_json(WALLETS_TABLE, wallet_id)
    }

    pub fn get_wallet_txn(
        &self,
        txn: &WriteTransaction,
        wallet_id: i64,
    ) -> StorageResult<Option<Wallet>> {
        Self::read_json_txn(txn, WALLETS_TABLE, wallet_id)
    }

    pub fn wallet_id_by_phone(&self, phone: &str) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_PHONES_TABLE)?;
        Ok(table.get(phone)?.map(|guard| guard.value()))
    }

    pub fn wallet_id_by_phone_txn(
        &self,
        txn: &WriteTransaction,
        phone: &str,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(WALLET_PHONES_TABLE)?;
        Ok(table.get(phone)?.map(|guard| guard.value()))
    }

    /// Store a wallet and (re)index its phone
    pub fn store_wallet_txn(&self, txn: &WriteTransaction, wallet: &Wallet) -> StorageResult<()> {
        Self::write_json_txn(txn, WALLETS_TABLE, wallet.id, wallet)?;
        let mut phones = txn.open_table(WALLET_PHONES_TABLE)?;
        phones.insert(wallet.client_phone.as_str(), wallet.id)?;
        Ok(())
    }

    pub fn list_wallets(&self) -> StorageResult<Vec<Wallet>> {
        self.scan_json(WALLETS_TABLE)
    }

    // ========== Ledger Transaction Operations ==========

    /// Append a ledger entry; entries are never updated or deleted
    pub fn append_transaction_txn(
        &self,
        txn: &WriteTransaction,
        entry: &LedgerTransaction,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entry)?;
        let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
        table.insert((entry.wallet_id, entry.id), bytes.as_slice())?;
        Ok(())
    }

    /// All ledger entries of a wallet, in key order
    pub fn list_wallet_transactions(&self, wallet_id: i64) -> StorageResult<Vec<LedgerTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.range((wallet_id, i64::MIN)..=(wallet_id, i64::MAX))? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    /// Every ledger entry of every wallet
    pub fn list_all_transactions(&self) -> StorageResult<Vec<LedgerTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    // ========== Order Operations ==========

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        self.read_json(ORDERS_TABLE, order_id)
    }

    pub fn get_order_txn(&self, txn: &WriteTransaction, order_id: i64) -> StorageResult<Option<Order>> {
        Self::read_json_txn(txn, ORDERS_TABLE, order_id)
    }

    pub fn store_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        Self::write_json_txn(txn, ORDERS_TABLE, order.id, order)
    }

    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        self.scan_json(ORDERS_TABLE)
    }

    pub fn store_order_items_txn(
        &self,
        txn: &WriteTransaction,
        items: &[OrderLineItem],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        for item in items {
            let bytes = serde_json::to_vec(item)?;
            table.insert((item.order_id, item.line_no), bytes.as_slice())?;
        }
        Ok(())
    }

    /// Line items of an order, ordered by line number
    pub fn get_order_items(&self, order_id: i64) -> StorageResult<Vec<OrderLineItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.range((order_id, 0u32)..=(order_id, u32::MAX))? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    pub fn get_order_items_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Vec<OrderLineItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.range((order_id, 0u32)..=(order_id, u32::MAX))? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    pub fn store_token_hash_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        token_hash: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_TOKENS_TABLE)?;
        table.insert(order_id, token_hash)?;
        Ok(())
    }

    pub fn get_token_hash(&self, order_id: i64) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_TOKENS_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    pub fn get_token_hash_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(ORDER_TOKENS_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    // ========== Pending Order Index ==========

    pub fn mark_pending_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        created_at: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
        table.insert(order_id, created_at)?;
        Ok(())
    }

    pub fn clear_pending_txn(&self, txn: &WriteTransaction, order_id: i64) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Pending orders as `(order_id, created_at)` pairs
    pub fn list_pending_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<(i64, i64)>> {
        let table = txn.open_table(PENDING_ORDERS_TABLE)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            out.push((key.value(), value.value()));
        }
        Ok(out)
    }

    pub fn count_pending(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Menu Operations ==========

    pub fn get_menu_item(&self, menu_item_id: i64) -> StorageResult<Option<MenuItem>> {
        self.read_json(MENU_ITEMS_TABLE, menu_item_id)
    }

    pub fn get_menu_item_txn(
        &self,
        txn: &WriteTransaction,
        menu_item_id: i64,
    ) -> StorageResult<Option<MenuItem>> {
        Self::read_json_txn(txn, MENU_ITEMS_TABLE, menu_item_id)
    }

    pub fn store_menu_item_txn(&self, txn: &WriteTransaction, item: &MenuItem) -> StorageResult<()> {
        Self::write_json_txn(txn, MENU_ITEMS_TABLE, item.id, item)
    }

    pub fn list_menu_items(&self) -> StorageResult<Vec<MenuItem>> {
        self.scan_json(MENU_ITEMS_TABLE)
    }

    // ========== Anomaly Operations ==========

    pub fn store_anomaly_txn(&self, txn: &WriteTransaction, anomaly: &Anomaly) -> StorageResult<()> {
        Self::write_json_txn(txn, ANOMALIES_TABLE, anomaly.id, anomaly)
    }

    pub fn list_anomalies(&self) -> StorageResult<Vec<Anomaly>> {
        self.scan_json(ANOMALIES_TABLE)
    }

    // ========== Stats ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;
        Ok(StorageStats {
            vouchers: read_txn.open_table(VOUCHERS_TABLE)?.len()?,
            wallets: read_txn.open_table(WALLETS_TABLE)?.len()?,
            orders: read_txn.open_table(ORDERS_TABLE)?.len()?,
            pending_orders: read_txn.open_table(PENDING_ORDERS_TABLE)?.len()?,
            menu_items: read_txn.open_table(MENU_ITEMS_TABLE)?.len()?,
            transactions: read_txn.open_table(TRANSACTIONS_TABLE)?.len()?,
            anomalies: read_txn.open_table(ANOMALIES_TABLE)?.len()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{TransactionType, VoucherStatus};

    fn sample_voucher(id: i64, code: &str) -> Voucher {
        Voucher {
            id,
            code: code.to_string(),
            face_value: 200.0,
            status: VoucherStatus::Active,
            issued_by: 1,
            issued_at: 1000,
            redeemed_by: None,
            redeemed_at: None,
            voided_at: None,
        }
    }

    #[test]
    fn test_voucher_code_index() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_voucher_txn(&txn, &sample_voucher(10, "SPOT-AAAA-BBBB-CCCC"))
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(
            storage.voucher_id_by_code("SPOT-AAAA-BBBB-CCCC").unwrap(),
            Some(10)
        );
        assert_eq!(storage.voucher_id_by_code("SPOT-0000-0000-0000").unwrap(), None);
        let voucher = storage.get_voucher(10).unwrap().unwrap();
        assert_eq!(voucher.face_value, 200.0);
    }

    #[test]
    fn test_uncommitted_write_is_discarded() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage
                .store_voucher_txn(&txn, &sample_voucher(11, "SPOT-DDDD-EEEE-FFFF"))
                .unwrap();
            // dropped without commit
        }
        assert!(storage.get_voucher(11).unwrap().is_none());
        assert_eq!(storage.get_stats().unwrap().vouchers, 0);
    }

    #[test]
    fn test_transactions_scoped_by_wallet() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for (wallet_id, id) in [(1, 100), (2, 101), (1, 102)] {
            let entry = LedgerTransaction {
                id,
                wallet_id,
                order_id: None,
                voucher_id: Some(5),
                amount: 10.0,
                transaction_type: TransactionType::Credit,
                description: "test".to_string(),
                created_at: id,
            };
            storage.append_transaction_txn(&txn, &entry).unwrap();
        }
        txn.commit().unwrap();

        let entries = storage.list_wallet_transactions(1).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.wallet_id == 1));
        assert_eq!(storage.get_stats().unwrap().transactions, 3);
    }

    #[test]
    fn test_pending_index() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.mark_pending_txn(&txn, 1, 500).unwrap();
        storage.mark_pending_txn(&txn, 2, 600).unwrap();
        storage.clear_pending_txn(&txn, 1).unwrap();
        assert_eq!(storage.list_pending_txn(&txn).unwrap(), vec![(2, 600)]);
        txn.commit().unwrap();
        assert_eq!(storage.count_pending().unwrap(), 1);
    }
}
