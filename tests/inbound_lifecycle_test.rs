mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use uuid::Uuid;
use wms_core::entities::inbound_order::InboundStatus;
use wms_core::entities::stock_record::StockKey;
use wms_core::errors::ServiceError;
use wms_core::services::inbound::{CreateInboundCommand, InboundItemInput, ReceiptLine};

fn two_line_command(warehouse_id: Uuid) -> CreateInboundCommand {
    CreateInboundCommand {
        inbound_no: format!("IN-{}", Uuid::new_v4().simple()),
        warehouse_id,
        supplier_id: Some(Uuid::new_v4()),
        items: vec![
            InboundItemInput {
                goods_id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                batch_no: "B-001".to_string(),
                expire_date: NaiveDate::from_ymd_opt(2027, 6, 30),
                plan_quantity: 100,
            },
            InboundItemInput {
                goods_id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                batch_no: "".to_string(),
                expire_date: None,
                plan_quantity: 40,
            },
        ],
        remark: Some("weekly replenishment".to_string()),
        operator: "clerk".to_string(),
    }
}

#[tokio::test]
async fn receipts_accrue_and_only_qualified_stock_posts() {
    let app = TestApp::new().await;
    let warehouse_id = Uuid::new_v4();
    let inbound = &app.state.inbound;

    let order = inbound.create(two_line_command(warehouse_id)).await.unwrap();
    assert_eq!(order.status(), Some(InboundStatus::Draft));

    inbound.audit(order.id, "auditor").await.unwrap();
    let items = inbound.items(order.id).await.unwrap();

    // Two partial receipts on the first line; 5 pieces fail inspection.
    inbound
        .receive(
            order.id,
            vec![ReceiptLine {
                item_id: items[0].id,
                quantity: 60,
                qualified_quantity: 60,
                unqualified_quantity: 0,
            }],
            "dock",
        )
        .await
        .unwrap();
    inbound
        .receive(
            order.id,
            vec![
                ReceiptLine {
                    item_id: items[0].id,
                    quantity: 40,
                    qualified_quantity: 35,
                    unqualified_quantity: 5,
                },
                ReceiptLine {
                    item_id: items[1].id,
                    quantity: 40,
                    qualified_quantity: 40,
                    unqualified_quantity: 0,
                },
            ],
            "dock",
        )
        .await
        .unwrap();

    let order = inbound.get(order.id).await.unwrap();
    assert_eq!(order.status(), Some(InboundStatus::Receiving));

    // No stock posted yet.
    let key0 = items[0].stock_key(warehouse_id);
    assert!(app.state.stock.get(&key0).await.unwrap().is_none());

    inbound.complete(order.id, "clerk").await.unwrap();

    let record = app.state.stock.get(&key0).await.unwrap().unwrap();
    assert_eq!(record.quantity, 95, "only qualified quantity posts");
    assert_eq!(record.expire_date, NaiveDate::from_ymd_opt(2027, 6, 30));

    let key1 = items[1].stock_key(warehouse_id);
    assert_eq!(app.state.stock.get(&key1).await.unwrap().unwrap().quantity, 40);

    let entries = app
        .state
        .ledger
        .entries_for_business_no(&order.inbound_no)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.operation_type == "INBOUND"));

    let items = inbound.items(order.id).await.unwrap();
    assert_eq!(items[0].received_quantity, 100);
    assert_eq!(items[0].qualified_quantity, 95);
    assert_eq!(items[0].unqualified_quantity, 5);
}

#[tokio::test]
async fn over_receipt_is_rejected() {
    let app = TestApp::new().await;
    let inbound = &app.state.inbound;
    let order = inbound.create(two_line_command(Uuid::new_v4())).await.unwrap();
    inbound.audit(order.id, "auditor").await.unwrap();
    let items = inbound.items(order.id).await.unwrap();

    let err = inbound
        .receive(
            order.id,
            vec![ReceiptLine {
                item_id: items[0].id,
                quantity: 101,
                qualified_quantity: 101,
                unqualified_quantity: 0,
            }],
            "dock",
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let items = inbound.items(order.id).await.unwrap();
    assert_eq!(items[0].received_quantity, 0);
}

#[tokio::test]
async fn completing_twice_does_not_double_post() {
    let app = TestApp::new().await;
    let warehouse_id = Uuid::new_v4();
    let inbound = &app.state.inbound;
    let order = inbound.create(two_line_command(warehouse_id)).await.unwrap();
    inbound.audit(order.id, "auditor").await.unwrap();
    let items = inbound.items(order.id).await.unwrap();
    inbound
        .receive(
            order.id,
            vec![ReceiptLine {
                item_id: items[0].id,
                quantity: 100,
                qualified_quantity: 100,
                unqualified_quantity: 0,
            }],
            "dock",
        )
        .await
        .unwrap();
    inbound.complete(order.id, "clerk").await.unwrap();

    // The header is terminal; a second complete is an invalid transition,
    // not a second posting.
    assert_matches!(
        inbound.complete(order.id, "clerk").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );

    let key = items[0].stock_key(warehouse_id);
    assert_eq!(app.state.stock.get(&key).await.unwrap().unwrap().quantity, 100);
}

#[tokio::test]
async fn cancelled_inbound_posts_nothing() {
    let app = TestApp::new().await;
    let warehouse_id = Uuid::new_v4();
    let inbound = &app.state.inbound;
    let order = inbound.create(two_line_command(warehouse_id)).await.unwrap();
    inbound.audit(order.id, "auditor").await.unwrap();
    let items = inbound.items(order.id).await.unwrap();
    inbound
        .receive(
            order.id,
            vec![ReceiptLine {
                item_id: items[0].id,
                quantity: 50,
                qualified_quantity: 50,
                unqualified_quantity: 0,
            }],
            "dock",
        )
        .await
        .unwrap();

    let order = inbound.cancel(order.id, "clerk").await.unwrap();
    assert_eq!(order.status(), Some(InboundStatus::Cancelled));
    // Repeat cancel is a no-op.
    inbound.cancel(order.id, "clerk").await.unwrap();

    let key: StockKey = items[0].stock_key(warehouse_id);
    assert!(app.state.stock.get(&key).await.unwrap().is_none());
    assert!(app
        .state
        .ledger
        .entries_for_business_no(&order.inbound_no)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn draft_cannot_receive_or_complete() {
    let app = TestApp::new().await;
    let inbound = &app.state.inbound;
    let order = inbound.create(two_line_command(Uuid::new_v4())).await.unwrap();
    let items = inbound.items(order.id).await.unwrap();

    assert_matches!(
        inbound
            .receive(
                order.id,
                vec![ReceiptLine {
                    item_id: items[0].id,
                    quantity: 10,
                    qualified_quantity: 10,
                    unqualified_quantity: 0,
                }],
                "dock"
            )
            .await
            .unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
    assert_matches!(
        inbound.complete(order.id, "clerk").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
}
