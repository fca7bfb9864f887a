//! Reporting aggregator
//!
//! Read-only projections over the ledger, the stock records and the
//! snapshot store: in/out flow per day and current or dated inventory
//! summaries. Nothing here mutates anything.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_log::{self, Entity as InventoryLogEntity, OperationType};
use crate::entities::stock_record::{self, Entity as StockRecordEntity};
use crate::entities::stock_snapshot::{self, Entity as StockSnapshotEntity};
use crate::errors::ServiceError;
use crate::masterdata::MasterDataRef;

/// Explicit filter set for report queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub warehouse_id: Option<Uuid>,
    pub goods_id: Option<Uuid>,
}

/// One day of ledger flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub inbound: i64,
    pub outbound: i64,
    pub move_in: i64,
    pub move_out: i64,
    pub taking_adjust: i64,
}

/// In/out totals over a window, by day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InOutSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub days: Vec<DailyFlow>,
    pub total_inbound: i64,
    pub total_outbound: i64,
}

/// Current (or dated) holdings of one goods in one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRow {
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub goods_name: Option<String>,
    pub quantity: i64,
    pub lock_quantity: i64,
    pub available: i64,
    pub batch_count: u32,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    masterdata: MasterDataRef,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>, masterdata: MasterDataRef) -> Self {
        Self { db, masterdata }
    }

    /// Folds ledger entries in `[from, to)` into per-day in/out totals.
    #[instrument(skip(self, filter))]
    pub async fn inout_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &ReportFilter,
    ) -> Result<InOutSummary, ServiceError> {
        if from >= to {
            return Err(ServiceError::ValidationError(
                "Report window is empty".to_string(),
            ));
        }

        let mut query = InventoryLogEntity::find()
            .filter(inventory_log::Column::CreatedAt.gte(from))
            .filter(inventory_log::Column::CreatedAt.lt(to));
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(inventory_log::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(goods_id) = filter.goods_id {
            query = query.filter(inventory_log::Column::GoodsId.eq(goods_id));
        }
        let entries = query
            .order_by_asc(inventory_log::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut days: BTreeMap<NaiveDate, DailyFlow> = BTreeMap::new();
        let mut total_inbound: i64 = 0;
        let mut total_outbound: i64 = 0;
        for entry in &entries {
            let day = entry.created_at.date_naive();
            let flow = days.entry(day).or_insert_with(|| DailyFlow {
                date: day,
                ..Default::default()
            });
            let change = entry.quantity_change as i64;
            match entry.operation() {
                Some(OperationType::Inbound) => {
                    flow.inbound += change;
                    total_inbound += change;
                }
                Some(OperationType::Outbound) => {
                    flow.outbound += -change;
                    total_outbound += -change;
                }
                Some(OperationType::MoveIn) => flow.move_in += change,
                Some(OperationType::MoveOut) => flow.move_out += -change,
                Some(OperationType::TakingAdjust) => flow.taking_adjust += change,
                None => {}
            }
        }

        Ok(InOutSummary {
            from,
            to,
            days: days.into_values().collect(),
            total_inbound,
            total_outbound,
        })
    }

    /// Current holdings per (warehouse, goods), folded from stock records.
    #[instrument(skip(self, filter))]
    pub async fn inventory_summary(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<InventoryRow>, ServiceError> {
        let mut query = StockRecordEntity::find();
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_record::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(goods_id) = filter.goods_id {
            query = query.filter(stock_record::Column::GoodsId.eq(goods_id));
        }
        let records = query.all(&*self.db).await?;

        let rows = records
            .iter()
            .map(|r| (r.warehouse_id, r.goods_id, r.quantity, r.lock_quantity));
        self.fold_rows(rows).await
    }

    /// Holdings per (warehouse, goods) as of a snapshot date.
    #[instrument(skip(self, filter))]
    pub async fn inventory_summary_on(
        &self,
        date: NaiveDate,
        filter: &ReportFilter,
    ) -> Result<Vec<InventoryRow>, ServiceError> {
        let mut query = StockSnapshotEntity::find()
            .filter(stock_snapshot::Column::SnapshotDate.eq(date));
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_snapshot::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(goods_id) = filter.goods_id {
            query = query.filter(stock_snapshot::Column::GoodsId.eq(goods_id));
        }
        let rows = query.all(&*self.db).await?;
        if rows.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No snapshot exists for {}",
                date
            )));
        }

        let rows = rows
            .iter()
            .map(|r| (r.warehouse_id, r.goods_id, r.quantity, r.lock_quantity));
        self.fold_rows(rows).await
    }

    async fn fold_rows(
        &self,
        rows: impl Iterator<Item = (Uuid, Uuid, i32, i32)>,
    ) -> Result<Vec<InventoryRow>, ServiceError> {
        let mut folded: BTreeMap<(Uuid, Uuid), (i64, i64, u32)> = BTreeMap::new();
        for (warehouse_id, goods_id, quantity, lock_quantity) in rows {
            let entry = folded.entry((warehouse_id, goods_id)).or_insert((0, 0, 0));
            entry.0 += quantity as i64;
            entry.1 += lock_quantity as i64;
            entry.2 += 1;
        }

        let mut result = Vec::with_capacity(folded.len());
        for ((warehouse_id, goods_id), (quantity, lock_quantity, batch_count)) in folded {
            result.push(InventoryRow {
                warehouse_id,
                goods_id,
                goods_name: self.masterdata.goods_name(goods_id).await?,
                quantity,
                lock_quantity,
                available: quantity - lock_quantity,
                batch_count,
            });
        }
        Ok(result)
    }
}
