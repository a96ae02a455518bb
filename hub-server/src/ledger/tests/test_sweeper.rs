use super::*;
use shared::models::CancelledBy;
use shared::util::now_millis;

#[test]
fn test_sweep_cancels_only_stale_orders() {
    let ledger = create_test_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 10.0, 50);

    let old = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);
    let max_age = Duration::from_secs(600);

    // 还没到期
    let swept = ledger.sweep_stale_orders(now_millis(), max_age).unwrap();
    assert!(swept.is_empty());

    let later = old.order.created_at + 600_000;
    std::thread::sleep(Duration::from_millis(5));
    let fresh = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);
    let swept = ledger.sweep_stale_orders(later, max_age).unwrap();

    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].id, old.order.id);
    assert_eq!(swept[0].cancelled_by, Some(CancelledBy::System));
    assert_eq!(swept[0].cancel_reason.as_deref(), Some(sweeper::EXPIRED_REASON));

    assert_eq!(
        ledger.get_order(fresh.order.id).unwrap().status,
        OrderStatus::PendingConfirmation
    );

    let err = ledger
        .confirm_order(old.order.id, &old.confirmation_token)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyTerminal { .. }));
}

#[test]
fn test_sweep_skips_settled_orders() {
    let ledger = create_test_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 10.0, 50);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);
    ledger
        .confirm_order(pending.order.id, &pending.confirmation_token)
        .unwrap();

    let far_future = now_millis() + 3_600_000;
    let swept = ledger
        .sweep_stale_orders(far_future, Duration::from_secs(60))
        .unwrap();
    assert!(swept.is_empty());
    assert_eq!(
        ledger.get_order(pending.order.id).unwrap().status,
        OrderStatus::Confirmed
    );
}

#[test]
fn test_sweep_publishes_cancellations() {
    let ledger = create_test_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 10.0, 50);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);

    let mut events = ledger.subscribe();
    ledger
        .sweep_stale_orders(now_millis() + 3_600_000, Duration::from_secs(60))
        .unwrap();
    let event = events.try_recv().unwrap();
    assert_eq!(event.order_id, pending.order.id);
    assert_eq!(event.status, OrderStatus::Cancelled);
    assert_eq!(ledger.storage().count_pending().unwrap(), 0);
}

#[tokio::test]
async fn test_run_sweeper_stops_on_shutdown() {
    let ledger = create_shared_ledger();
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(sweeper::run_sweeper(
        Arc::clone(&ledger),
        Duration::from_millis(20),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(60)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}
