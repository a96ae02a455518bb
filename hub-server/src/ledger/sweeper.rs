//! 过期订单清理器
//!
//! 终端断线或进程重启都会留下 `pending_confirmation` 订单。清理器周期扫描
//! `pending_orders` 索引，把超过 `PENDING_ORDER_MAX_AGE_SECS` 的订单取消。
//!
//! 注册为 `TaskKind::Periodic`，在 `Server::run()` 中启动。

use super::error::LedgerResult;
use super::storage::StorageError;
use super::Ledger;
use shared::models::{CancelledBy, Order};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const EXPIRED_REASON: &str = "expired";

impl Ledger {
    /// Cancel every pending order created at or before `now - max_age`
    ///
    /// Runs in one write transaction; returns the cancelled orders.
    pub fn sweep_stale_orders(&self, now: i64, max_age: Duration) -> LedgerResult<Vec<Order>> {
        let cutoff = now - max_age.as_millis() as i64;

        let txn = self.storage.begin_write()?;
        let stale: Vec<i64> = self
            .storage
            .list_pending_txn(&txn)?
            .into_iter()
            .filter(|(_, created_at)| *created_at <= cutoff)
            .map(|(order_id, _)| order_id)
            .collect();

        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let mut cancelled = Vec::with_capacity(stale.len());
        for order_id in stale {
            let Some(order) = self.storage.get_order_txn(&txn, order_id)? else {
                // 索引残留，直接清除
                self.storage.clear_pending_txn(&txn, order_id)?;
                continue;
            };
            if order.status.is_terminal() {
                self.storage.clear_pending_txn(&txn, order_id)?;
                continue;
            }
            let order =
                self.cancel_pending_txn(&txn, order, EXPIRED_REASON.to_string(), CancelledBy::System)?;
            cancelled.push(order);
        }
        txn.commit().map_err(StorageError::from)?;

        for order in &cancelled {
            self.publish(order);
        }
        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), "Stale pending orders cancelled");
        }
        Ok(cancelled)
    }
}

/// 周期循环：每 `interval` 扫描一次，直到收到 shutdown
pub async fn run_sweeper(
    ledger: Arc<Ledger>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let max_age = ledger.settings().pending_order_max_age;
    tracing::info!(
        interval_secs = interval.as_secs(),
        max_age_secs = max_age.as_secs(),
        "Pending order sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => {
                tracing::info!("Pending order sweeper received shutdown signal");
                return;
            }
        }

        let now = shared::util::now_millis();
        if let Err(e) = ledger
            .blocking(move |l| l.sweep_stale_orders(now, max_age))
            .await
        {
            tracing::error!(error = %e, "Pending order sweep failed");
        }
    }
}
