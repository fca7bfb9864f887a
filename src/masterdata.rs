//! Master data lookup boundary
//!
//! The core resolves goods/warehouse names for display and reads safety
//! stock thresholds, nothing more; it never owns or validates master data.
//! Deployments inject their own client; the in-memory implementation backs
//! the binary's defaults and the test suites.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Read-only master data lookups consumed by snapshots and reports.
#[async_trait]
pub trait MasterDataLookup: Send + Sync {
    async fn goods_name(&self, goods_id: Uuid) -> Result<Option<String>, ServiceError>;

    async fn warehouse_name(&self, warehouse_id: Uuid) -> Result<Option<String>, ServiceError>;

    async fn location_exists(&self, location_id: Uuid) -> Result<bool, ServiceError>;

    /// Safety stock for a (goods, warehouse) pair; `None` disables the
    /// low-stock warning for the pair.
    async fn safety_stock(
        &self,
        goods_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<i32>, ServiceError>;
}

/// Shared handle used across services.
pub type MasterDataRef = Arc<dyn MasterDataLookup>;

/// Process-local master data, populated at wiring time.
#[derive(Default)]
pub struct InMemoryMasterData {
    goods: DashMap<Uuid, String>,
    warehouses: DashMap<Uuid, String>,
    locations: DashMap<Uuid, ()>,
    safety_stocks: DashMap<(Uuid, Uuid), i32>,
}

impl InMemoryMasterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_goods(&self, id: Uuid, name: &str) {
        self.goods.insert(id, name.to_string());
    }

    pub fn add_warehouse(&self, id: Uuid, name: &str) {
        self.warehouses.insert(id, name.to_string());
    }

    pub fn add_location(&self, id: Uuid) {
        self.locations.insert(id, ());
    }

    pub fn set_safety_stock(&self, goods_id: Uuid, warehouse_id: Uuid, threshold: i32) {
        self.safety_stocks.insert((goods_id, warehouse_id), threshold);
    }
}

#[async_trait]
impl MasterDataLookup for InMemoryMasterData {
    async fn goods_name(&self, goods_id: Uuid) -> Result<Option<String>, ServiceError> {
        Ok(self.goods.get(&goods_id).map(|name| name.value().clone()))
    }

    async fn warehouse_name(&self, warehouse_id: Uuid) -> Result<Option<String>, ServiceError> {
        Ok(self
            .warehouses
            .get(&warehouse_id)
            .map(|name| name.value().clone()))
    }

    async fn location_exists(&self, location_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.locations.contains_key(&location_id))
    }

    async fn safety_stock(
        &self,
        goods_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<i32>, ServiceError> {
        Ok(self
            .safety_stocks
            .get(&(goods_id, warehouse_id))
            .map(|threshold| *threshold.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_return_registered_values() {
        let data = InMemoryMasterData::new();
        let goods = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        data.add_goods(goods, "Widget");
        data.set_safety_stock(goods, warehouse, 25);

        assert_eq!(data.goods_name(goods).await.unwrap().as_deref(), Some("Widget"));
        assert_eq!(data.goods_name(Uuid::new_v4()).await.unwrap(), None);
        assert_eq!(data.safety_stock(goods, warehouse).await.unwrap(), Some(25));
        assert!(!data.location_exists(Uuid::new_v4()).await.unwrap());
    }
}
