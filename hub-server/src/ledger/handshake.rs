//! Staff-side confirmation wait
//!
//! The POS terminal holds a request open while the client confirms or
//! rejects on their own device. The wait ends on the order's terminal event,
//! on timeout, or when the terminal cancels (clear cart / disconnect). In the
//! last two cases the order is withdrawn, so it is never left pending.

use super::error::{LedgerError, LedgerResult};
use super::Ledger;
use crate::auth::CurrentUser;
use crate::auth::permissions::ORDERS_CREATE;
use shared::models::{CancelledBy, ConfirmationOutcome, Order, OrderStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Why the wait stopped without a terminal event
#[derive(Debug, Clone, Copy)]
enum StopReason {
    Timeout,
    Cancelled,
}

/// Map a terminal order to the outcome the terminal shows
fn outcome_for(order: Order) -> ConfirmationOutcome {
    match (order.status, order.cancelled_by) {
        (OrderStatus::Confirmed, _) => ConfirmationOutcome::Confirmed(order),
        (_, Some(CancelledBy::Staff)) => ConfirmationOutcome::Withdrawn(order),
        (_, Some(CancelledBy::System)) => ConfirmationOutcome::TimedOut(order),
        _ => ConfirmationOutcome::Rejected(order),
    }
}

impl Ledger {
    /// Wait for the client's decision on a pending order
    ///
    /// `timeout` is capped by the configured confirmation timeout.
    pub async fn await_confirmation(
        self: &Arc<Self>,
        user: &CurrentUser,
        order_id: i64,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> LedgerResult<ConfirmationOutcome> {
        self.authorize(user, ORDERS_CREATE)?;
        let limit = self.settings.confirmation_timeout;
        let timeout = timeout.map_or(limit, |t| t.min(limit));

        // 先订阅再读状态，避免错过事件
        let mut events = self.subscribe();
        let order = self.blocking(move |l| l.get_order(order_id)).await?;
        if order.status.is_terminal() {
            return Ok(outcome_for(order));
        }

        tracing::debug!(order_id, timeout_secs = timeout.as_secs(), "Awaiting client confirmation");
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let reason = loop {
            tokio::select! {
                _ = &mut deadline => break StopReason::Timeout,
                _ = cancel.cancelled() => break StopReason::Cancelled,
                received = events.recv() => match received {
                    Ok(event) if event.order_id == order_id && event.status.is_terminal() => {
                        let order = self.blocking(move |l| l.get_order(order_id)).await?;
                        return Ok(outcome_for(order));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(order_id, skipped, "Order event receiver lagged, re-reading status");
                        let order = self.blocking(move |l| l.get_order(order_id)).await?;
                        if order.status.is_terminal() {
                            return Ok(outcome_for(order));
                        }
                    }
                    Err(RecvError::Closed) => break StopReason::Cancelled,
                },
            }
        };

        let (reason_text, cancelled_by) = match reason {
            StopReason::Timeout => ("confirmation timed out", CancelledBy::System),
            StopReason::Cancelled => ("withdrawn by staff", CancelledBy::Staff),
        };
        let result = self
            .blocking(move |l| l.withdraw_pending(order_id, reason_text.to_string(), cancelled_by))
            .await;

        match result {
            Ok(withdrawal) if withdrawal.changed => {
                tracing::info!(order_id, reason = ?reason, "Confirmation wait ended, order withdrawn");
                Ok(outcome_for(withdrawal.order))
            }
            // 客户端在撤回前已取消
            Ok(withdrawal) => Ok(outcome_for(withdrawal.order)),
            // 客户端赢得竞争：订单已结算
            Err(LedgerError::ConcurrencyConflict(_)) => {
                let order = self.blocking(move |l| l.get_order(order_id)).await?;
                Ok(ConfirmationOutcome::Confirmed(order))
            }
            Err(e) => Err(e),
        }
    }
}
