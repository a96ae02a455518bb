use super::*;
use shared::models::{CancelledBy, ConfirmationOutcome};
use tokio_util::sync::CancellationToken;

fn spawn_wait(
    ledger: &Arc<Ledger>,
    order_id: i64,
    timeout: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<LedgerResult<ConfirmationOutcome>> {
    let ledger = Arc::clone(ledger);
    tokio::spawn(async move {
        ledger
            .await_confirmation(&barman(), order_id, Some(timeout), cancel)
            .await
    })
}

#[tokio::test]
async fn test_confirm_wakes_waiter() {
    let ledger = create_shared_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 100.0, 10);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 2)]);

    let waiter = spawn_wait(
        &ledger,
        pending.order.id,
        Duration::from_secs(30),
        CancellationToken::new(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    let order_id = pending.order.id;
    let token = pending.confirmation_token.clone();
    ledger
        .blocking(move |l| l.confirm_order(order_id, &token))
        .await
        .unwrap();

    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, ConfirmationOutcome::Confirmed(_)));
    assert_eq!(outcome.order().status, OrderStatus::Confirmed);
    assert_eq!(ledger.get_wallet(wallet.id).unwrap().balance, 300.0);
}

#[tokio::test]
async fn test_client_reject_wakes_waiter() {
    let ledger = create_shared_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 100.0, 10);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);

    let waiter = spawn_wait(
        &ledger,
        pending.order.id,
        Duration::from_secs(30),
        CancellationToken::new(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    ledger
        .cancel_order(pending.order.id, &pending.confirmation_token, None)
        .unwrap();

    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, ConfirmationOutcome::Rejected(_)));
}

#[tokio::test]
async fn test_timeout_withdraws_order() {
    let ledger = create_shared_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 100.0, 10);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);

    let outcome = ledger
        .await_confirmation(
            &barman(),
            pending.order.id,
            Some(Duration::from_millis(100)),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, ConfirmationOutcome::TimedOut(_)));
    let order = ledger.get_order(pending.order.id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.cancelled_by, Some(CancelledBy::System));

    // 超时后客户端再确认必须失败
    let err = ledger
        .confirm_order(pending.order.id, &pending.confirmation_token)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyTerminal { .. }));
    assert_eq!(ledger.get_wallet(wallet.id).unwrap().balance, 500.0);
}

#[tokio::test]
async fn test_cancel_token_withdraws_order() {
    let ledger = create_shared_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 100.0, 10);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);

    let cancel = CancellationToken::new();
    let waiter = spawn_wait(
        &ledger,
        pending.order.id,
        Duration::from_secs(30),
        cancel.clone(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, ConfirmationOutcome::Withdrawn(_)));
    assert_eq!(
        ledger.get_order(pending.order.id).unwrap().cancelled_by,
        Some(CancelledBy::Staff)
    );
    assert_eq!(ledger.storage().count_pending().unwrap(), 0);
}

#[tokio::test]
async fn test_wait_on_terminal_order_returns_immediately() {
    let ledger = create_shared_ledger();
    let wallet = funded_wallet(&ledger, TEST_PHONE, 500.0);
    let item = seed_menu_item(&ledger, "X", 100.0, 10);
    let pending = place_order(&ledger, wallet.id, vec![line(item.id, 1)]);
    ledger
        .confirm_order(pending.order.id, &pending.confirmation_token)
        .unwrap();

    let outcome = ledger
        .await_confirmation(
            &barman(),
            pending.order.id,
            Some(Duration::from_millis(10)),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, ConfirmationOutcome::Confirmed(_)));
}

#[tokio::test]
async fn test_wait_requires_permission() {
    let ledger = create_shared_ledger();
    let err = ledger
        .await_confirmation(&teller(), 1, None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}
