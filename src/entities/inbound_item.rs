use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_record::StockKey;

/// One planned receipt line.
///
/// `received_quantity` accrues during partial receipts with no stock effect;
/// only `qualified_quantity` is posted to stock on completion.
/// `unqualified_quantity` stays on the line for audit.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub inbound_id: Uuid,
    pub line_no: i32,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
    pub expire_date: Option<NaiveDate>,
    pub plan_quantity: i32,
    pub received_quantity: i32,
    pub qualified_quantity: i32,
    pub unqualified_quantity: i32,
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
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inbound_order::Entity",
        from = "Column::InboundId",
        to = "super::inbound_order::Column::Id"
    )]
    Order,
}

impl Related<super::inbound_order::Entity> for Entity {
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
