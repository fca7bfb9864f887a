mod common;

use assert_matches::assert_matches;
use common::{random_key, TestApp};
use wms_core::entities::outbound_order::OutboundStatus;
use wms_core::errors::ServiceError;
use wms_core::services::outbound::{
    CreateOutboundCommand, OutboundItemInput, PickLine, ShipLine,
};

fn order_command(key: &wms_core::entities::stock_record::StockKey, plan: i32) -> CreateOutboundCommand {
    CreateOutboundCommand {
        outbound_no: format!("OUT-{}", uuid::Uuid::new_v4().simple()),
        warehouse_id: key.warehouse_id,
        customer_id: None,
        items: vec![OutboundItemInput {
            goods_id: key.goods_id,
            location_id: key.location_id,
            batch_no: key.batch_no.clone(),
            plan_quantity: plan,
        }],
        remark: None,
        operator: "tester".to_string(),
    }
}

/// The reference scenario: 100 on hand, reserve 30, ship 30. Quantity ends
/// at 70 with the hold drained, and the ledger shows one OUTBOUND entry
/// with before=100, change=-30, after=70.
#[tokio::test]
async fn reserve_then_ship_full_flow() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 30)).await.unwrap();
    assert_eq!(order.status(), Some(OutboundStatus::Draft));

    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.lock_quantity, 30);
    assert_eq!(record.available(), 70);

    let items = outbound.items(order.id).await.unwrap();
    assert_eq!(items[0].reserved_quantity, 30);

    outbound
        .record_pick(
            order.id,
            vec![PickLine {
                item_id: items[0].id,
                quantity: 30,
            }],
            "picker",
        )
        .await
        .unwrap();
    outbound.mark_ready(order.id, "tester").await.unwrap();

    let order = outbound
        .complete(
            order.id,
            vec![ShipLine {
                item_id: items[0].id,
                quantity: 30,
            }],
            "shipper",
        )
        .await
        .unwrap();
    assert_eq!(order.status(), Some(OutboundStatus::Completed));

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 70);
    assert_eq!(record.lock_quantity, 0);

    let entries = app
        .state
        .ledger
        .entries_for_business_no(&order.outbound_no)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation_type, "OUTBOUND");
    assert_eq!(entries[0].quantity_before, 100);
    assert_eq!(entries[0].quantity_change, -30);
    assert_eq!(entries[0].quantity_after, 70);
}

#[tokio::test]
async fn over_shipment_aborts_whole_completion() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 30)).await.unwrap();
    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();
    outbound.mark_ready(order.id, "tester").await.unwrap();

    let items = outbound.items(order.id).await.unwrap();
    let err = outbound
        .complete(
            order.id,
            vec![ShipLine {
                item_id: items[0].id,
                quantity: 31,
            }],
            "shipper",
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Header and stock both untouched, ready for retry.
    let order = outbound.get(order.id).await.unwrap();
    assert_eq!(order.status(), Some(OutboundStatus::AwaitingShipment));
    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 100);
    assert_eq!(record.lock_quantity, 30);
}

#[tokio::test]
async fn partial_shipment_releases_leftover_hold() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 30)).await.unwrap();
    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();
    outbound.mark_ready(order.id, "tester").await.unwrap();

    let items = outbound.items(order.id).await.unwrap();
    outbound
        .complete(
            order.id,
            vec![ShipLine {
                item_id: items[0].id,
                quantity: 12,
            }],
            "shipper",
        )
        .await
        .unwrap();

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 88);
    assert_eq!(record.lock_quantity, 0);

    let items = outbound.items(order.id).await.unwrap();
    assert_eq!(items[0].shipped_quantity, 12);
    assert_eq!(items[0].reserved_quantity, 0);
}

#[tokio::test]
async fn cancellation_releases_all_outstanding_reservations() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 45)).await.unwrap();
    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();
    assert_eq!(
        app.state.stock.get(&key).await.unwrap().unwrap().available(),
        55
    );

    let order = outbound.cancel(order.id, "tester").await.unwrap();
    assert_eq!(order.status(), Some(OutboundStatus::Cancelled));
    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 100);
    assert_eq!(record.lock_quantity, 0);

    // No ledger entries: reservations do not post.
    let entries = app
        .state
        .ledger
        .entries_for_business_no(&order.outbound_no)
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn picking_requires_available_stock() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 10).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 25)).await.unwrap();
    outbound.audit(order.id, "tester").await.unwrap();

    let err = outbound.start_picking(order.id, "tester").await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // The order can retry once stock arrives.
    let order = outbound.get(order.id).await.unwrap();
    assert_eq!(order.status(), Some(OutboundStatus::Audited));
    assert_eq!(
        app.state.stock.get(&key).await.unwrap().unwrap().lock_quantity,
        0
    );

    app.seed_stock(&key, 20).await;
    outbound.start_picking(order.id, "tester").await.unwrap();
}

#[tokio::test]
async fn transitions_are_validated() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 50).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 10)).await.unwrap();

    // Draft cannot enter picking or complete.
    assert_matches!(
        outbound.start_picking(order.id, "tester").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
    assert_matches!(
        outbound.complete(order.id, vec![], "tester").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );

    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();
    outbound.mark_ready(order.id, "tester").await.unwrap();
    outbound.complete(order.id, vec![], "tester").await.unwrap();

    // Terminal: no cancellation after completion.
    assert_matches!(
        outbound.cancel(order.id, "tester").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
}

#[tokio::test]
async fn delete_releases_holds_and_hides_order() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 50).await;

    let outbound = &app.state.outbound;
    let order = outbound.create(order_command(&key, 10)).await.unwrap();
    outbound.audit(order.id, "tester").await.unwrap();
    outbound.start_picking(order.id, "tester").await.unwrap();

    // Deleting mid-picking releases the hold first.
    outbound.delete(order.id, "tester").await.unwrap();
    assert_matches!(
        outbound.get(order.id).await.unwrap_err(),
        ServiceError::NotFound(_)
    );
    assert_eq!(
        app.state.stock.get(&key).await.unwrap().unwrap().lock_quantity,
        0
    );
}
