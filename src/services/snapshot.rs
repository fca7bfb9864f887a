//! Snapshot & warning engine
//!
//! Materializes dated point-in-time copies of the stock records and
//! derives low-stock/expiry warnings. Strictly read-only with respect to
//! the ledger: nothing here posts, reserves or releases.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::stock_snapshot::{self, Entity as StockSnapshotEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::masterdata::MasterDataRef;
use crate::services::stock::StockStore;

lazy_static! {
    static ref SNAPSHOTS_TAKEN: IntCounter = IntCounter::new(
        "stock_snapshots_taken_total",
        "Total number of snapshot runs"
    )
    .expect("metric can be created");
}

const SNAPSHOT_PAGE_SIZE: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    LowStock,
    Expiring,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::LowStock => "LOW_STOCK",
            WarningKind::Expiring => "EXPIRING",
        }
    }
}

/// One derived warning. Never persisted; recomputed on every call so it
/// cannot drift from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockWarning {
    pub kind: WarningKind,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub goods_name: Option<String>,
    /// LOW_STOCK: summed available vs. threshold.
    pub available: Option<i32>,
    pub safety_stock: Option<i32>,
    /// EXPIRING: the batch at risk.
    pub location_id: Option<Uuid>,
    pub batch_no: Option<String>,
    pub expire_date: Option<NaiveDate>,
    pub quantity: Option<i32>,
}

#[derive(Clone)]
pub struct SnapshotService {
    db: Arc<DatabaseConnection>,
    stock: StockStore,
    masterdata: MasterDataRef,
    event_sender: EventSender,
    expiry_window_days: i64,
}

impl SnapshotService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        stock: StockStore,
        masterdata: MasterDataRef,
        event_sender: EventSender,
        expiry_window_days: i64,
    ) -> Self {
        Self {
            db,
            stock,
            masterdata,
            event_sender,
            expiry_window_days,
        }
    }

    /// Copies every stock record into the snapshot table under `date`.
    /// Re-running for the same date replaces that date's rows, so a
    /// failed or repeated run converges instead of duplicating.
    #[instrument(skip(self))]
    pub async fn take_snapshot(&self, date: NaiveDate) -> Result<u64, ServiceError> {
        StockSnapshotEntity::delete_many()
            .filter(stock_snapshot::Column::SnapshotDate.eq(date))
            .exec(&*self.db)
            .await?;

        let mut count: u64 = 0;
        let mut page: u64 = 0;
        loop {
            let (records, pages) = self.stock.list_page(page, SNAPSHOT_PAGE_SIZE).await?;
            for record in &records {
                let row = stock_snapshot::ActiveModel {
                    snapshot_date: Set(date),
                    warehouse_id: Set(record.warehouse_id),
                    goods_id: Set(record.goods_id),
                    location_id: Set(record.location_id),
                    batch_no: Set(record.batch_no.clone()),
                    quantity: Set(record.quantity),
                    lock_quantity: Set(record.lock_quantity),
                    expire_date: Set(record.expire_date),
                    ..Default::default()
                };
                row.insert(&*self.db).await?;
                count += 1;
            }
            page += 1;
            if page >= pages {
                break;
            }
        }

        SNAPSHOTS_TAKEN.inc();
        self.event_sender
            .send_or_log(Event::SnapshotTaken {
                snapshot_date: date,
                record_count: count,
            })
            .await;
        info!(date = %date, records = count, "stock snapshot taken");
        Ok(count)
    }

    /// All snapshot rows for one date.
    pub async fn snapshot_for(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<stock_snapshot::Model>, ServiceError> {
        let rows = StockSnapshotEntity::find()
            .filter(stock_snapshot::Column::SnapshotDate.eq(date))
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Derives warnings from the current stock records: LOW_STOCK per
    /// (goods, warehouse) whose summed available quantity is under its
    /// safety stock, and EXPIRING per batch inside the expiry window with
    /// stock on hand. Pure: calling twice without intervening mutation
    /// yields the same result.
    #[instrument(skip(self))]
    pub async fn current_warnings(&self) -> Result<Vec<StockWarning>, ServiceError> {
        let today = Utc::now().date_naive();
        let horizon = today + ChronoDuration::days(self.expiry_window_days);

        let mut warnings = Vec::new();
        let mut available_by_pair: BTreeMap<(Uuid, Uuid), i32> = BTreeMap::new();

        let mut page: u64 = 0;
        loop {
            let (records, pages) = self.stock.list_page(page, SNAPSHOT_PAGE_SIZE).await?;
            for record in &records {
                *available_by_pair
                    .entry((record.warehouse_id, record.goods_id))
                    .or_insert(0) += record.available();

                if record.quantity > 0 {
                    if let Some(expire_date) = record.expire_date {
                        if expire_date <= horizon {
                            warnings.push(StockWarning {
                                kind: WarningKind::Expiring,
                                warehouse_id: record.warehouse_id,
                                goods_id: record.goods_id,
                                goods_name: self.masterdata.goods_name(record.goods_id).await?,
                                available: None,
                                safety_stock: None,
                                location_id: Some(record.location_id),
                                batch_no: Some(record.batch_no.clone()),
                                expire_date: Some(expire_date),
                                quantity: Some(record.quantity),
                            });
                        }
                    }
                }
            }
            page += 1;
            if page >= pages {
                break;
            }
        }

        for ((warehouse_id, goods_id), available) in available_by_pair {
            let threshold = self.masterdata.safety_stock(goods_id, warehouse_id).await?;
            if let Some(threshold) = threshold {
                if available < threshold {
                    warnings.push(StockWarning {
                        kind: WarningKind::LowStock,
                        warehouse_id,
                        goods_id,
                        goods_name: self.masterdata.goods_name(goods_id).await?,
                        available: Some(available),
                        safety_stock: Some(threshold),
                        location_id: None,
                        batch_no: None,
                        expire_date: None,
                        quantity: None,
                    });
                }
            }
        }

        Ok(warnings)
    }

    /// Daily snapshot loop; spawned by the binary.
    pub async fn run_scheduler(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let date = Utc::now().date_naive();
            if let Err(e) = self.take_snapshot(date).await {
                error!(error = %e, "scheduled snapshot failed");
            }
        }
    }
}
