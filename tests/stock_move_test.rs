mod common;

use assert_matches::assert_matches;
use common::{random_key, TestApp};
use uuid::Uuid;
use wms_core::entities::stock_move::MoveStatus;
use wms_core::entities::stock_record::StockKey;
use wms_core::errors::ServiceError;
use wms_core::services::stock_move::CreateMoveCommand;

fn move_command(key: &StockKey, to_location: Uuid, quantity: i32) -> CreateMoveCommand {
    CreateMoveCommand {
        move_no: format!("MV-{}", Uuid::new_v4().simple()),
        warehouse_id: key.warehouse_id,
        goods_id: key.goods_id,
        batch_no: key.batch_no.clone(),
        from_location_id: key.location_id,
        to_location_id: to_location,
        quantity,
        remark: None,
        operator: "mover".to_string(),
    }
}

#[tokio::test]
async fn executed_move_posts_both_legs() {
    let app = TestApp::new().await;
    let from = random_key();
    let to_location = Uuid::new_v4();
    app.seed_stock(&from, 80).await;

    let mv = app
        .state
        .stock_move
        .create(move_command(&from, to_location, 30))
        .await
        .unwrap();
    assert_eq!(mv.status(), Some(MoveStatus::Pending));

    let mv = app.state.stock_move.execute(mv.id, "mover").await.unwrap();
    assert_eq!(mv.status(), Some(MoveStatus::Completed));

    let to = StockKey::new(from.warehouse_id, from.goods_id, to_location, &from.batch_no);
    assert_eq!(app.state.stock.get(&from).await.unwrap().unwrap().quantity, 50);
    assert_eq!(app.state.stock.get(&to).await.unwrap().unwrap().quantity, 30);

    let entries = app
        .state
        .ledger
        .entries_for_business_no(&mv.move_no)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    let out_leg = entries.iter().find(|e| e.operation_type == "MOVE_OUT").unwrap();
    let in_leg = entries.iter().find(|e| e.operation_type == "MOVE_IN").unwrap();
    assert_eq!(out_leg.quantity_change, -30);
    assert_eq!(in_leg.quantity_change, 30);

    assert!(app.state.ledger.reconcile(&from).await.unwrap().balanced);
    assert!(app.state.ledger.reconcile(&to).await.unwrap().balanced);
}

/// If the outbound leg cannot post, the move fails with the source
/// location untouched.
#[tokio::test]
async fn failed_move_leaves_source_unchanged() {
    let app = TestApp::new().await;
    let from = random_key();
    app.seed_stock(&from, 20).await;
    // Hold part of the stock so only 5 can leave.
    app.state.stock.reserve(from.clone(), 15).await.unwrap();

    let mv = app
        .state
        .stock_move
        .create(move_command(&from, Uuid::new_v4(), 10))
        .await
        .unwrap();
    let err = app.state.stock_move.execute(mv.id, "mover").await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let record = app.state.stock.get(&from).await.unwrap().unwrap();
    assert_eq!(record.quantity, 20);
    assert_eq!(record.lock_quantity, 15);
    // The interrupted move is visible and retryable.
    let mv = app.state.stock_move.get(mv.id).await.unwrap();
    assert_eq!(mv.status(), Some(MoveStatus::Executing));

    // After the hold clears, the retry completes the same move.
    app.state.stock.release(from.clone(), 15).await.unwrap();
    let mv = app.state.stock_move.execute(mv.id, "mover").await.unwrap();
    assert_eq!(mv.status(), Some(MoveStatus::Completed));
    assert_eq!(app.state.stock.get(&from).await.unwrap().unwrap().quantity, 10);
}

#[tokio::test]
async fn cancel_only_before_execution() {
    let app = TestApp::new().await;
    let from = random_key();
    app.seed_stock(&from, 30).await;

    let mv = app
        .state
        .stock_move
        .create(move_command(&from, Uuid::new_v4(), 10))
        .await
        .unwrap();
    let mv = app.state.stock_move.cancel(mv.id, "mover").await.unwrap();
    assert_eq!(mv.status(), Some(MoveStatus::Cancelled));
    // Repeat cancel is a no-op.
    app.state.stock_move.cancel(mv.id, "mover").await.unwrap();

    let mv2 = app
        .state
        .stock_move
        .create(move_command(&from, Uuid::new_v4(), 10))
        .await
        .unwrap();
    app.state.stock_move.execute(mv2.id, "mover").await.unwrap();
    assert_matches!(
        app.state.stock_move.cancel(mv2.id, "mover").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
}

#[tokio::test]
async fn move_to_same_location_is_rejected() {
    let app = TestApp::new().await;
    let from = random_key();
    let err = app
        .state
        .stock_move
        .create(move_command(&from, from.location_id, 10))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
