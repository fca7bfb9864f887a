use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_record::StockKey;

/// Kind of quantity mutation recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Inbound,
    Outbound,
    MoveOut,
    MoveIn,
    TakingAdjust,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Inbound => "INBOUND",
            OperationType::Outbound => "OUTBOUND",
            OperationType::MoveOut => "MOVE_OUT",
            OperationType::MoveIn => "MOVE_IN",
            OperationType::TakingAdjust => "TAKING_ADJUST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INBOUND" => Some(OperationType::Inbound),
            "OUTBOUND" => Some(OperationType::Outbound),
            "MOVE_OUT" => Some(OperationType::MoveOut),
            "MOVE_IN" => Some(OperationType::MoveIn),
            "TAKING_ADJUST" => Some(OperationType::TakingAdjust),
            _ => None,
        }
    }
}

/// One immutable ledger row. Rows are only ever inserted, in the same
/// transaction as the stock record mutation they describe; no update or
/// delete path exists anywhere in the crate.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
    pub operation_type: String,
    pub business_type: String,
    /// Originating order number.
    pub business_no: String,
    /// Line discriminator within the order; part of the idempotency key.
    pub business_line: String,
    pub quantity_before: i32,
    /// Signed. `quantity_after = quantity_before + quantity_change`.
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub operator: String,
    pub created_at: DateTime<Utc>,
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

    pub fn operation(&self) -> Option<OperationType> {
        OperationType::parse(&self.operation_type)
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
        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_round_trip() {
        for op in [
            OperationType::Inbound,
            OperationType::Outbound,
            OperationType::MoveOut,
            OperationType::MoveIn,
            OperationType::TakingAdjust,
        ] {
            assert_eq!(OperationType::parse(op.as_str()), Some(op));
        }
        assert_eq!(OperationType::parse("UNKNOWN"), None);
    }
}
