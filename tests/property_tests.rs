//! Randomized invariant checks: arbitrary op sequences on one stock key
//! must never break `0 <= lock <= quantity`, and the ledger must always
//! reconcile to the record.

mod common;

use proptest::prelude::*;

use common::{random_key, TestApp};
use wms_core::entities::inventory_log::OperationType;
use wms_core::errors::ServiceError;
use wms_core::services::stock::StockPosting;

#[derive(Debug, Clone)]
enum Op {
    Adjust(i32),
    Reserve(i32),
    Release(i32),
    Consume(i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-60..=60i32).prop_map(Op::Adjust),
        (1..=40i32).prop_map(Op::Reserve),
        (1..=40i32).prop_map(Op::Release),
        (1..=40i32).prop_map(Op::Consume),
    ]
}

fn acceptable(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::InsufficientStock(_) | ServiceError::ValidationError(_)
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 16,
        .. ProptestConfig::default()
    })]

    #[test]
    fn invariants_hold_under_random_op_sequences(
        ops in proptest::collection::vec(op_strategy(), 1..24)
    ) {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async move {
            let app = TestApp::new().await;
            let key = random_key();

            for (i, op) in ops.iter().enumerate() {
                let result = match op {
                    Op::Adjust(delta) => app
                        .state
                        .stock
                        .adjust(StockPosting {
                            key: key.clone(),
                            quantity: *delta,
                            operation_type: OperationType::TakingAdjust,
                            business_type: "prop".to_string(),
                            business_no: format!("PROP-{}", i),
                            business_line: "1".to_string(),
                            operator: "prop".to_string(),
                            expire_date: None,
                        })
                        .await
                        .map(|_| ()),
                    Op::Reserve(amount) => app
                        .state
                        .stock
                        .reserve(key.clone(), *amount)
                        .await
                        .map(|_| ()),
                    Op::Release(amount) => app
                        .state
                        .stock
                        .release(key.clone(), *amount)
                        .await
                        .map(|_| ()),
                    Op::Consume(amount) => app
                        .state
                        .stock
                        .consume(StockPosting {
                            key: key.clone(),
                            quantity: *amount,
                            operation_type: OperationType::Outbound,
                            business_type: "prop".to_string(),
                            business_no: format!("PROP-{}", i),
                            business_line: "1".to_string(),
                            operator: "prop".to_string(),
                            expire_date: None,
                        })
                        .await
                        .map(|_| ()),
                };

                if let Err(err) = result {
                    prop_assert!(
                        acceptable(&err),
                        "unexpected error kind: {err}"
                    );
                }

                if let Some(record) = app.state.stock.get(&key).await.unwrap() {
                    prop_assert!(record.quantity >= 0);
                    prop_assert!(record.lock_quantity >= 0);
                    prop_assert!(record.lock_quantity <= record.quantity);
                }
            }

            let recon = app.state.ledger.reconcile(&key).await.unwrap();
            prop_assert!(
                recon.balanced,
                "ledger total {} != record quantity {}",
                recon.ledger_total,
                recon.record_quantity
            );
            Ok(())
        })?;
    }
}
