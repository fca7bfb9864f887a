//! Inventory Log queries
//!
//! Read-only access to the append-only ledger. Nothing here (or anywhere
//! else) updates or deletes `inventory_log` rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_log::{self, Entity as InventoryLogEntity};
use crate::entities::stock_record::{self, Entity as StockRecordEntity, StockKey};
use crate::errors::ServiceError;

/// Explicit filter set for ledger range queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub warehouse_id: Option<Uuid>,
    pub goods_id: Option<Uuid>,
    pub operation_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Result of checking a key's ledger against its stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub key: StockKey,
    pub entry_count: u64,
    /// Sum of all signed changes for the key.
    pub ledger_total: i64,
    /// The stock record's current quantity (zero for a never-seen key).
    pub record_quantity: i32,
    pub balanced: bool,
}

#[derive(Clone)]
pub struct InventoryLogService {
    db: Arc<DatabaseConnection>,
}

impl InventoryLogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Full history for one stock key, oldest first.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn entries_for_key(
        &self,
        key: &StockKey,
    ) -> Result<Vec<inventory_log::Model>, ServiceError> {
        let entries = InventoryLogEntity::find()
            .filter(inventory_log::Column::WarehouseId.eq(key.warehouse_id))
            .filter(inventory_log::Column::GoodsId.eq(key.goods_id))
            .filter(inventory_log::Column::LocationId.eq(key.location_id))
            .filter(inventory_log::Column::BatchNo.eq(key.batch_no.clone()))
            .order_by_asc(inventory_log::Column::CreatedAt)
            .order_by_asc(inventory_log::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }

    /// Every posting made under one order number, oldest first.
    #[instrument(skip(self))]
    pub async fn entries_for_business_no(
        &self,
        business_no: &str,
    ) -> Result<Vec<inventory_log::Model>, ServiceError> {
        let entries = InventoryLogEntity::find()
            .filter(inventory_log::Column::BusinessNo.eq(business_no))
            .order_by_asc(inventory_log::Column::CreatedAt)
            .order_by_asc(inventory_log::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }

    /// Paginated window query, newest first.
    #[instrument(skip(self, query))]
    pub async fn entries_in_range(
        &self,
        query: &LedgerQuery,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_log::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let mut select = InventoryLogEntity::find();
        if let Some(warehouse_id) = query.warehouse_id {
            select = select.filter(inventory_log::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(goods_id) = query.goods_id {
            select = select.filter(inventory_log::Column::GoodsId.eq(goods_id));
        }
        if let Some(operation_type) = &query.operation_type {
            select = select.filter(inventory_log::Column::OperationType.eq(operation_type.clone()));
        }
        if let Some(from) = query.from {
            select = select.filter(inventory_log::Column::CreatedAt.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(inventory_log::Column::CreatedAt.lt(to));
        }
        select = select.order_by_desc(inventory_log::Column::CreatedAt);

        let paginator = select.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page - 1).await?;
        Ok((entries, total))
    }

    /// Checks the reconciliation property for one key: the sum of all
    /// ledger changes must equal the record's current quantity.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn reconcile(&self, key: &StockKey) -> Result<Reconciliation, ServiceError> {
        let entries = self.entries_for_key(key).await?;
        let ledger_total: i64 = entries.iter().map(|e| e.quantity_change as i64).sum();

        let record_quantity = StockRecordEntity::find()
            .filter(stock_record::Column::WarehouseId.eq(key.warehouse_id))
            .filter(stock_record::Column::GoodsId.eq(key.goods_id))
            .filter(stock_record::Column::LocationId.eq(key.location_id))
            .filter(stock_record::Column::BatchNo.eq(key.batch_no.clone()))
            .one(&*self.db)
            .await?
            .map(|r| r.quantity)
            .unwrap_or(0);

        Ok(Reconciliation {
            key: key.clone(),
            entry_count: entries.len() as u64,
            ledger_total,
            record_quantity,
            balanced: ledger_total == record_quantity as i64,
        })
    }

    /// Distinct keys present in the ledger; drives full-store audits.
    pub async fn logged_keys(&self) -> Result<Vec<StockKey>, ServiceError> {
        let rows: Vec<(Uuid, Uuid, Uuid, String)> = InventoryLogEntity::find()
            .select_only()
            .column(inventory_log::Column::WarehouseId)
            .column(inventory_log::Column::GoodsId)
            .column(inventory_log::Column::LocationId)
            .column(inventory_log::Column::BatchNo)
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(warehouse_id, goods_id, location_id, batch_no)| StockKey {
                warehouse_id,
                goods_id,
                location_id,
                batch_no,
            })
            .collect())
    }
}
