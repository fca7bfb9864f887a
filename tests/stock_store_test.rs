mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{random_key, TestApp};
use wms_core::entities::inventory_log::OperationType;
use wms_core::entities::stock_record::StockKey;
use wms_core::errors::ServiceError;
use wms_core::services::stock::{StockOp, StockPosting};

fn posting(key: &StockKey, quantity: i32, business_no: &str) -> StockPosting {
    StockPosting {
        key: key.clone(),
        quantity,
        operation_type: OperationType::Inbound,
        business_type: "inbound".to_string(),
        business_no: business_no.to_string(),
        business_line: "1".to_string(),
        operator: "tester".to_string(),
        expire_date: None,
    }
}

#[tokio::test]
async fn adjust_creates_record_and_ledger_entry() {
    let app = TestApp::new().await;
    let key = random_key();

    let result = app
        .state
        .stock
        .adjust(posting(&key, 100, "IN-100"))
        .await
        .unwrap();
    assert_eq!(result.quantity_before, 0);
    assert_eq!(result.quantity_change, 100);
    assert_eq!(result.quantity_after, 100);
    assert!(!result.duplicate);
    assert!(result.log_id.is_some());

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 100);
    assert_eq!(record.lock_quantity, 0);

    let entries = app.state.ledger.entries_for_key(&key).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quantity_before, 0);
    assert_eq!(entries[0].quantity_after, 100);
}

#[tokio::test]
async fn duplicate_posting_is_applied_once() {
    let app = TestApp::new().await;
    let key = random_key();

    let first = app
        .state
        .stock
        .adjust(posting(&key, 40, "IN-DUP"))
        .await
        .unwrap();
    assert!(!first.duplicate);

    // Retrying the identical posting must not change stock again.
    let second = app
        .state
        .stock
        .adjust(posting(&key, 40, "IN-DUP"))
        .await
        .unwrap();
    assert!(second.duplicate);
    assert_eq!(second.quantity_before, first.quantity_before);
    assert_eq!(second.quantity_after, first.quantity_after);
    assert_eq!(second.log_id, first.log_id);

    assert_eq!(app.state.stock.get(&key).await.unwrap().unwrap().quantity, 40);
    let entries = app.state.ledger.entries_for_key(&key).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn negative_adjust_cannot_undershoot_zero() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 10).await;

    let err = app
        .state
        .stock
        .adjust(posting(&key, -11, "OUT-1"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Nothing changed.
    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 10);
    let recon = app.state.ledger.reconcile(&key).await.unwrap();
    assert!(recon.balanced);
}

#[tokio::test]
async fn adjust_cannot_drop_below_hold() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 50).await;
    app.state.stock.reserve(key.clone(), 30).await.unwrap();

    let err = app
        .state
        .stock
        .adjust(posting(&key, -25, "OUT-2"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 50);
    assert_eq!(record.lock_quantity, 30);
}

#[tokio::test]
async fn reserve_consume_release_cycle_keeps_invariants() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    app.state.stock.reserve(key.clone(), 30).await.unwrap();
    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 100);
    assert_eq!(record.lock_quantity, 30);
    assert_eq!(record.available(), 70);

    let mut consume = posting(&key, 30, "OUT-SHIP");
    consume.operation_type = OperationType::Outbound;
    let result = app.state.stock.consume(consume).await.unwrap();
    assert_eq!(result.quantity_before, 100);
    assert_eq!(result.quantity_change, -30);
    assert_eq!(result.quantity_after, 70);

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 70);
    assert_eq!(record.lock_quantity, 0);
}

#[tokio::test]
async fn consume_beyond_hold_fails_without_side_effects() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;
    app.state.stock.reserve(key.clone(), 20).await.unwrap();

    let mut consume = posting(&key, 25, "OUT-OVER");
    consume.operation_type = OperationType::Outbound;
    let err = app.state.stock.consume(consume).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 100);
    assert_eq!(record.lock_quantity, 20);
    // No OUTBOUND entry was written.
    let entries = app.state.ledger.entries_for_key(&key).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn release_beyond_hold_is_rejected() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 10).await;
    app.state.stock.reserve(key.clone(), 5).await.unwrap();

    let err = app.state.stock.release(key.clone(), 6).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    app.state.stock.release(key.clone(), 5).await.unwrap();
    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.lock_quantity, 0);
}

#[tokio::test]
async fn batch_failure_rolls_back_every_leg() {
    let app = TestApp::new().await;
    let key_a = random_key();
    let key_b = random_key();
    app.seed_stock(&key_a, 50).await;
    // key_b never stocked: the second leg must fail.

    let mut leg_a = posting(&key_a, -10, "MV-1");
    leg_a.operation_type = OperationType::MoveOut;
    let mut leg_b = posting(&key_b, -10, "MV-1");
    leg_b.operation_type = OperationType::MoveOut;
    leg_b.business_line = "2".to_string();

    let err = app
        .state
        .stock
        .adjust_batch(vec![leg_a, leg_b])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // First leg rolled back with the failed batch.
    let record = app.state.stock.get(&key_a).await.unwrap().unwrap();
    assert_eq!(record.quantity, 50);
    assert!(app
        .state
        .ledger
        .entries_for_key(&key_a)
        .await
        .unwrap()
        .iter()
        .all(|e| e.operation_type != "MOVE_OUT"));
}

#[tokio::test]
async fn mixed_ops_execute_atomically() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 60).await;
    app.state.stock.reserve(key.clone(), 25).await.unwrap();

    let mut consume = posting(&key, 20, "OUT-MIX");
    consume.operation_type = OperationType::Outbound;
    let ops = vec![
        StockOp::Consume(consume),
        StockOp::Release {
            key: key.clone(),
            amount: 5,
        },
    ];
    app.state.stock.execute(ops).await.unwrap();

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 40);
    assert_eq!(record.lock_quantity, 0);
}

#[tokio::test]
async fn ledger_reconciles_after_interleaved_operations() {
    let app = TestApp::new().await;
    let key = random_key();

    app.state.stock.adjust(posting(&key, 100, "IN-A")).await.unwrap();
    app.state.stock.adjust(posting(&key, 50, "IN-B")).await.unwrap();
    app.state.stock.reserve(key.clone(), 40).await.unwrap();
    let mut consume = posting(&key, 40, "OUT-C");
    consume.operation_type = OperationType::Outbound;
    app.state.stock.consume(consume).await.unwrap();
    let mut shrink = posting(&key, -15, "ADJ-D");
    shrink.operation_type = OperationType::TakingAdjust;
    app.state.stock.adjust(shrink).await.unwrap();

    let recon = app.state.ledger.reconcile(&key).await.unwrap();
    assert_eq!(recon.entry_count, 4);
    assert_eq!(recon.ledger_total, 95);
    assert_eq!(recon.record_quantity, 95);
    assert!(recon.balanced);
}

#[tokio::test]
async fn ledger_queries_by_business_no_and_range() {
    let app = TestApp::new().await;
    let key = random_key();
    app.state.stock.adjust(posting(&key, 10, "IN-Q1")).await.unwrap();
    app.state.stock.adjust(posting(&key, 20, "IN-Q2")).await.unwrap();

    let by_no = app
        .state
        .ledger
        .entries_for_business_no("IN-Q1")
        .await
        .unwrap();
    assert_eq!(by_no.len(), 1);
    assert_eq!(by_no[0].quantity_change, 10);

    let query = wms_core::services::ledger::LedgerQuery {
        warehouse_id: Some(key.warehouse_id),
        ..Default::default()
    };
    let (entries, total) = app
        .state
        .ledger
        .entries_in_range(&query, 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(entries.len(), 2);

    let miss = wms_core::services::ledger::LedgerQuery {
        warehouse_id: Some(Uuid::new_v4()),
        ..Default::default()
    };
    let (_, total) = app.state.ledger.entries_in_range(&miss, 1, 10).await.unwrap();
    assert_eq!(total, 0);
}
