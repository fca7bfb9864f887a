use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical key of one stock record: the unit of linearization for every
/// mutation. Goods without batch tracking use an empty `batch_no`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
}

impl StockKey {
    pub fn new(warehouse_id: Uuid, goods_id: Uuid, location_id: Uuid, batch_no: &str) -> Self {
        Self {
            warehouse_id,
            goods_id,
            location_id,
            batch_no: batch_no.to_string(),
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.warehouse_id, self.goods_id, self.location_id, self.batch_no
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
    /// On-hand quantity. Never negative.
    pub quantity: i32,
    /// Portion of `quantity` held by in-flight outbound/move work.
    /// Invariant: `0 <= lock_quantity <= quantity`.
    pub lock_quantity: i32,
    pub expire_date: Option<NaiveDate>,
    /// Bumped on every mutation.
    pub version: i32,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn key(&self) -> StockKey {
        StockKey {
            warehouse_id: self.warehouse_id,
            goods_id: self.goods_id,
            location_id: self.location_id,
            batch_no: self.batch_no.clone(),
        }
    }

    /// Quantity free to reserve.
    pub fn available(&self) -> i32 {
        self.quantity - self.lock_quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_subtracts_lock() {
        let record = Model {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            goods_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            batch_no: "B1".to_string(),
            quantity: 100,
            lock_quantity: 30,
            expire_date: None,
            version: 1,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(record.available(), 70);
    }

    #[test]
    fn keys_order_deterministically() {
        let w = Uuid::new_v4();
        let g = Uuid::new_v4();
        let l = Uuid::new_v4();
        let a = StockKey::new(w, g, l, "A");
        let b = StockKey::new(w, g, l, "B");
        assert!(a < b);
        assert_eq!(a, StockKey::new(w, g, l, "A"));
    }
}
