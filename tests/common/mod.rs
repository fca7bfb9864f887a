//! Test harness: application state backed by an in-memory SQLite database.
#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use wms_core::config::AppConfig;
use wms_core::db::{self, DbConfig};
use wms_core::entities::inventory_log::OperationType;
use wms_core::entities::stock_record::StockKey;
use wms_core::events;
use wms_core::masterdata::InMemoryMasterData;
use wms_core::services::stock::{PostingResult, StockPosting};
use wms_core::AppState;

pub struct TestApp {
    pub state: AppState,
    pub masterdata: Arc<InMemoryMasterData>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Fresh state on a private in-memory database. A single pooled
    /// connection keeps SQLite's one-database-per-connection semantics
    /// out of the way.
    pub async fn new() -> Self {
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let masterdata = Arc::new(InMemoryMasterData::new());
        let cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        let state = AppState::build(
            Arc::new(pool),
            cfg,
            masterdata.clone(),
            event_sender,
        );

        Self {
            state,
            masterdata,
            _event_task: event_task,
        }
    }

    /// Puts `quantity` on hand for `key` through a plain inbound posting.
    pub async fn seed_stock(&self, key: &StockKey, quantity: i32) -> PostingResult {
        self.state
            .stock
            .adjust(StockPosting {
                key: key.clone(),
                quantity,
                operation_type: OperationType::Inbound,
                business_type: "seed".to_string(),
                business_no: format!("SEED-{}", Uuid::new_v4().simple()),
                business_line: "1".to_string(),
                operator: "seeder".to_string(),
                expire_date: None,
            })
            .await
            .expect("seeding stock should succeed")
    }
}

/// Random stock key within one warehouse/location.
pub fn random_key() -> StockKey {
    StockKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "BATCH-1")
}
