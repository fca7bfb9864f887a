mod common;

use assert_matches::assert_matches;
use common::{random_key, TestApp};
use uuid::Uuid;
use wms_core::entities::stock_record::StockKey;
use wms_core::entities::stock_taking_line::TakingLineStatus;
use wms_core::entities::stock_taking_plan::TakingPlanStatus;
use wms_core::errors::ServiceError;
use wms_core::services::stock_taking::CreatePlanCommand;

fn plan_command(warehouse_id: Uuid) -> CreatePlanCommand {
    CreatePlanCommand {
        plan_no: format!("ST-{}", Uuid::new_v4().simple()),
        warehouse_id,
        location_id: None,
        goods_id: None,
        remark: None,
        operator: "counter".to_string(),
    }
}

/// The reference scenario: book 100, counted 95, adjustment posts -5 as
/// TAKING_ADJUST and the record lands on 95.
#[tokio::test]
async fn count_difference_posts_taking_adjustment() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 100).await;

    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(key.warehouse_id)).await.unwrap();
    let plan = taking.generate_lines(plan.id, "counter").await.unwrap();
    assert_eq!(plan.status(), Some(TakingPlanStatus::Counting));
    assert_eq!(plan.line_count, 1);

    let lines = taking.lines(plan.id).await.unwrap();
    assert_eq!(lines[0].book_quantity, 100);

    taking.count(lines[0].id, 95, "counter").await.unwrap();
    taking.review(lines[0].id, "reviewer").await.unwrap();
    let line = taking.adjust(lines[0].id, "reviewer").await.unwrap();
    assert_eq!(line.status(), Some(TakingLineStatus::Adjusted));

    let record = app.state.stock.get(&key).await.unwrap().unwrap();
    assert_eq!(record.quantity, 95);

    let entries = app
        .state
        .ledger
        .entries_for_business_no(&plan.plan_no)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation_type, "TAKING_ADJUST");
    assert_eq!(entries[0].quantity_change, -5);
    assert_eq!(entries[0].quantity_after, 95);

    let plan = taking.complete_plan(plan.id, "counter").await.unwrap();
    assert_eq!(plan.status(), Some(TakingPlanStatus::Completed));
    assert_eq!(plan.completed_count, 1);
    assert_eq!(plan.diff_count, 1);
}

#[tokio::test]
async fn scope_narrows_generated_lines() {
    let app = TestApp::new().await;
    let warehouse_id = Uuid::new_v4();
    let goods_a = Uuid::new_v4();
    let goods_b = Uuid::new_v4();
    let location = Uuid::new_v4();
    let key_a = StockKey::new(warehouse_id, goods_a, location, "A1");
    let key_b = StockKey::new(warehouse_id, goods_b, location, "B1");
    let key_other = random_key();
    app.seed_stock(&key_a, 10).await;
    app.seed_stock(&key_b, 20).await;
    app.seed_stock(&key_other, 30).await;

    let taking = &app.state.stock_taking;
    let mut cmd = plan_command(warehouse_id);
    cmd.goods_id = Some(goods_a);
    let plan = taking.create_plan(cmd).await.unwrap();
    let plan = taking.generate_lines(plan.id, "counter").await.unwrap();

    assert_eq!(plan.line_count, 1);
    let lines = taking.lines(plan.id).await.unwrap();
    assert_eq!(lines[0].goods_id, goods_a);
    assert_eq!(lines[0].book_quantity, 10);
}

#[tokio::test]
async fn surplus_count_posts_positive_adjustment() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 50).await;

    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(key.warehouse_id)).await.unwrap();
    taking.generate_lines(plan.id, "counter").await.unwrap();
    let lines = taking.lines(plan.id).await.unwrap();

    taking.count(lines[0].id, 57, "counter").await.unwrap();
    taking.review(lines[0].id, "reviewer").await.unwrap();
    taking.adjust(lines[0].id, "reviewer").await.unwrap();

    assert_eq!(app.state.stock.get(&key).await.unwrap().unwrap().quantity, 57);
    assert!(app.state.ledger.reconcile(&key).await.unwrap().balanced);
}

#[tokio::test]
async fn zero_difference_settles_without_posting() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 50).await;

    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(key.warehouse_id)).await.unwrap();
    taking.generate_lines(plan.id, "counter").await.unwrap();
    let lines = taking.lines(plan.id).await.unwrap();

    taking.count(lines[0].id, 50, "counter").await.unwrap();
    taking.review(lines[0].id, "reviewer").await.unwrap();
    taking.adjust(lines[0].id, "reviewer").await.unwrap();

    let entries = app
        .state
        .ledger
        .entries_for_business_no(&plan.plan_no)
        .await
        .unwrap();
    assert!(entries.is_empty());

    let plan = taking.complete_plan(plan.id, "counter").await.unwrap();
    assert_eq!(plan.completed_count, 1);
    assert_eq!(plan.diff_count, 0);
}

#[tokio::test]
async fn excluded_lines_settle_the_plan() {
    let app = TestApp::new().await;
    let key_a = random_key();
    let key_b = StockKey::new(key_a.warehouse_id, Uuid::new_v4(), key_a.location_id, "X");
    app.seed_stock(&key_a, 10).await;
    app.seed_stock(&key_b, 20).await;

    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(key_a.warehouse_id)).await.unwrap();
    taking.generate_lines(plan.id, "counter").await.unwrap();
    let lines = taking.lines(plan.id).await.unwrap();
    assert_eq!(lines.len(), 2);

    // Plan cannot complete while lines are open.
    assert_matches!(
        taking.complete_plan(plan.id, "counter").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );

    taking.count(lines[0].id, lines[0].book_quantity, "counter").await.unwrap();
    taking.review(lines[0].id, "reviewer").await.unwrap();
    taking.adjust(lines[0].id, "reviewer").await.unwrap();
    taking.exclude(lines[1].id, "reviewer").await.unwrap();

    let plan = taking.complete_plan(plan.id, "counter").await.unwrap();
    assert_eq!(plan.status(), Some(TakingPlanStatus::Completed));
    assert_eq!(plan.completed_count, 2);
}

#[tokio::test]
async fn lines_enforce_count_review_adjust_order() {
    let app = TestApp::new().await;
    let key = random_key();
    app.seed_stock(&key, 10).await;

    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(key.warehouse_id)).await.unwrap();
    taking.generate_lines(plan.id, "counter").await.unwrap();
    let lines = taking.lines(plan.id).await.unwrap();

    assert_matches!(
        taking.review(lines[0].id, "reviewer").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );
    assert_matches!(
        taking.adjust(lines[0].id, "reviewer").await.unwrap_err(),
        ServiceError::InvalidTransition(_)
    );

    // Recount before review overwrites.
    taking.count(lines[0].id, 8, "counter").await.unwrap();
    taking.count(lines[0].id, 9, "counter").await.unwrap();
    taking.review(lines[0].id, "reviewer").await.unwrap();
    taking.adjust(lines[0].id, "reviewer").await.unwrap();
    assert_eq!(app.state.stock.get(&key).await.unwrap().unwrap().quantity, 9);
}

#[tokio::test]
async fn empty_scope_yields_completable_plan() {
    let app = TestApp::new().await;
    let taking = &app.state.stock_taking;
    let plan = taking.create_plan(plan_command(Uuid::new_v4())).await.unwrap();
    let plan = taking.generate_lines(plan.id, "counter").await.unwrap();
    assert_eq!(plan.line_count, 0);

    let plan = taking.complete_plan(plan.id, "counter").await.unwrap();
    assert_eq!(plan.status(), Some(TakingPlanStatus::Completed));
}
