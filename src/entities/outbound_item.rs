use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_record::StockKey;

/// One planned shipment line.
///
/// `reserved_quantity` is the line's live hold against the stock record's
/// `lock_quantity`. It is set when the order enters picking, drained by
/// consumption at completion, and zeroed by release on cancellation, always
/// in the same transaction as the stock-side change. That shared
/// transaction is what makes cancellation safe to retry.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbound_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub outbound_id: Uuid,
    pub line_no: i32,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
    pub plan_quantity: i32,
    pub picked_quantity: i32,
    pub shipped_quantity: i32,
    pub reserved_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn stock_key(&self, warehouse_id: Uuid) -> StockKey {
        StockKey {
            warehouse_id,
            goods_id: self.goods_id,
            location_id: self.location_id,
            batch_no: self.batch_no.clone(),
        }
    }

    /// Plan quantity not yet picked.
    pub fn outstanding(&self) -> i32 {
        self.plan_quantity - self.picked_quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::outbound_order::Entity",
        from = "Column::OutboundId",
        to = "super::outbound_order::Column::Id"
    )]
    Order,
}

impl Related<super::outbound_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

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
