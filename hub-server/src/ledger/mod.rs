//! Ledger - vouchers, wallets, orders and settlement
//!
//! Every multi-record update is one redb write transaction. redb admits a
//! single writer at a time, so concurrent redemptions of one code, concurrent
//! confirms of one order and redemption-vs-settlement on one wallet all
//! serialize, and the loser re-reads the committed state.
//!
//! # Operation Flow
//!
//! ```text
//! operation(session?, input)
//!     ├─ 1. Permission check (staff operations)
//!     ├─ 2. Input validation, pre-generate ids / codes / tokens
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Re-read every record the decision depends on
//!     ├─ 5. Apply all writes
//!     ├─ 6. Commit (dropping the transaction on error discards every write)
//!     └─ 7. Broadcast OrderStatusEvent (order operations)
//! ```

pub mod codes;
pub mod error;
pub mod handshake;
pub mod menu;
pub mod money;
pub mod orders;
pub mod reporting;
pub mod settlement;
pub mod storage;
pub mod sweeper;
pub mod vouchers;

#[cfg(test)]
mod tests;

pub use error::{Entity, LedgerError, LedgerResult};
pub use storage::{LedgerStorage, StorageError, StorageStats};

use crate::auth::CurrentUser;
use crate::security_log;
use redb::WriteTransaction;
use shared::models::{Anomaly, AnomalyKind, Order, OrderStatusEvent};
use shared::util::{now_millis, snowflake_id};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Business settings taken from [`Config`](crate::core::Config)
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Face value used when the issuer does not pass one
    pub default_face_value: f64,
    pub max_face_value: f64,
    /// Base of the confirmation link shown as QR to the client
    pub public_base_url: String,
    /// Upper bound of the staff-side confirmation wait
    pub confirmation_timeout: Duration,
    /// Pending orders older than this are reclaimed by the sweeper
    pub pending_order_max_age: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_face_value: 500.0,
            max_face_value: 10_000.0,
            public_base_url: "http://localhost:9625".to_string(),
            confirmation_timeout: Duration::from_secs(300),
            pending_order_max_age: Duration::from_secs(600),
        }
    }
}

/// Ledger service
///
/// Owns the storage and the order status broadcast channel. All methods are
/// blocking; async callers go through [`Ledger::blocking`].
pub struct Ledger {
    storage: LedgerStorage,
    event_tx: broadcast::Sender<OrderStatusEvent>,
    settings: LedgerSettings,
    /// Server instance epoch, regenerated on every startup
    epoch: String,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("storage", &"<LedgerStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("settings", &self.settings)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl Ledger {
    /// Open the ledger database at the given path
    pub fn open(db_path: impl AsRef<Path>, settings: LedgerSettings) -> LedgerResult<Self> {
        let storage = LedgerStorage::open(db_path)?;
        Ok(Self::from_storage(storage, settings))
    }

    /// Create a ledger over existing storage
    pub fn from_storage(storage: LedgerStorage, settings: LedgerSettings) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "Ledger started with new epoch");
        Self {
            storage,
            event_tx,
            settings,
            epoch,
        }
    }

    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to order status events
    pub fn subscribe(&self) -> broadcast::Receiver<OrderStatusEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an order's committed status
    fn publish(&self, order: &Order) {
        let event = OrderStatusEvent {
            order_id: order.id,
            status: order.status,
            timestamp: now_millis(),
        };
        // 没有订阅者时 send 返回错误，属于正常情况
        if self.event_tx.send(event).is_err() {
            tracing::debug!(order_id = order.id, "No subscribers for order status event");
        }
    }

    /// Re-check a staff permission inside the service
    fn authorize(&self, user: &CurrentUser, permission: &'static str) -> LedgerResult<()> {
        if user.has_permission(permission) {
            return Ok(());
        }
        security_log!(
            "WARN",
            "permission_denied",
            user_id = user.id,
            username = user.username.clone(),
            required_permission = permission
        );
        Err(LedgerError::Forbidden(format!(
            "Permission denied: {}",
            permission
        )))
    }

    /// Run a blocking ledger call on the blocking thread pool
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Ledger) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&ledger))
            .await
            .map_err(|e| LedgerError::Internal(format!("ledger task failed: {}", e)))?
    }

    /// Append an anomaly row and log it on the `invariant` target
    fn record_anomaly_txn(
        &self,
        txn: &WriteTransaction,
        kind: AnomalyKind,
        target: String,
        details: String,
        order_id: Option<i64>,
    ) -> LedgerResult<()> {
        tracing::error!(
            target: "invariant",
            kind = ?kind,
            target_record = %target,
            order_id = ?order_id,
            "{}",
            details
        );
        let anomaly = Anomaly {
            id: snowflake_id(),
            kind,
            target,
            details,
            order_id,
            created_at: now_millis(),
        };
        self.storage.store_anomaly_txn(txn, &anomaly)?;
        Ok(())
    }
}
