use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_record::StockKey;

/// Location-to-location move lifecycle.
///
/// `Executing` is set before the two ledger legs post, so a crash between
/// the status write and the posting is visible and the retry path can pick
/// the move back up. Cancellation is only allowed while still `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStatus {
    Pending,
    Executing,
    Completed,
    Cancelled,
}

impl MoveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveStatus::Pending => "pending",
            MoveStatus::Executing => "executing",
            MoveStatus::Completed => "completed",
            MoveStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MoveStatus::Pending),
            "executing" => Some(MoveStatus::Executing),
            "completed" => Some(MoveStatus::Completed),
            "cancelled" => Some(MoveStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition(&self, to: MoveStatus) -> bool {
        use MoveStatus::*;
        matches!(
            (self, to),
            (Pending, Executing) | (Executing, Completed) | (Pending, Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_moves")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub move_no: String,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub batch_no: String,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub remark: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<MoveStatus> {
        MoveStatus::parse(&self.status)
    }

    pub fn from_key(&self) -> StockKey {
        StockKey {
            warehouse_id: self.warehouse_id,
            goods_id: self.goods_id,
            location_id: self.from_location_id,
            batch_no: self.batch_no.clone(),
        }
    }

    pub fn to_key(&self) -> StockKey {
        StockKey {
            warehouse_id: self.warehouse_id,
            goods_id: self.goods_id,
            location_id: self.to_location_id,
            batch_no: self.batch_no.clone(),
        }
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
    fn cancellation_only_from_pending() {
        use MoveStatus::*;
        assert!(Pending.can_transition(Cancelled));
        assert!(!Executing.can_transition(Cancelled));
        assert!(!Completed.can_transition(Cancelled));
    }
}
