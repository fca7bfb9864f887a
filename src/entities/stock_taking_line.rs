use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock_record::StockKey;

/// Per-record count lifecycle: Pending -> Counted -> Reviewed -> Adjusted,
/// with Excluded reachable while the count is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakingLineStatus {
    Pending,
    Counted,
    Reviewed,
    Adjusted,
    Excluded,
}

impl TakingLineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakingLineStatus::Pending => "pending",
            TakingLineStatus::Counted => "counted",
            TakingLineStatus::Reviewed => "reviewed",
            TakingLineStatus::Adjusted => "adjusted",
            TakingLineStatus::Excluded => "excluded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TakingLineStatus::Pending),
            "counted" => Some(TakingLineStatus::Counted),
            "reviewed" => Some(TakingLineStatus::Reviewed),
            "adjusted" => Some(TakingLineStatus::Adjusted),
            "excluded" => Some(TakingLineStatus::Excluded),
            _ => None,
        }
    }

    /// Terminal for the owning plan's completion accounting.
    pub fn is_settled(&self) -> bool {
        matches!(self, TakingLineStatus::Adjusted | TakingLineStatus::Excluded)
    }

    pub fn can_transition(&self, to: TakingLineStatus) -> bool {
        use TakingLineStatus::*;
        matches!(
            (self, to),
            (Pending, Counted)
                // Recount before review is allowed.
                | (Counted, Counted)
                | (Counted, Reviewed)
                | (Reviewed, Adjusted)
                | (Pending, Excluded)
                | (Counted, Excluded)
                | (Reviewed, Excluded)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_taking_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub plan_id: Uuid,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    pub location_id: Uuid,
    pub batch_no: String,
    /// Stock record quantity at plan-generation time.
    pub book_quantity: i32,
    pub actual_quantity: Option<i32>,
    pub status: String,
    pub counted_by: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<TakingLineStatus> {
        TakingLineStatus::parse(&self.status)
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey {
            warehouse_id: self.warehouse_id,
            goods_id: self.goods_id,
            location_id: self.location_id,
            batch_no: self.batch_no.clone(),
        }
    }

    /// Signed count difference; `None` until counted.
    pub fn difference(&self) -> Option<i32> {
        self.actual_quantity.map(|actual| actual - self.book_quantity)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_taking_plan::Entity",
        from = "Column::PlanId",
        to = "super::stock_taking_plan::Column::Id"
    )]
    Plan,
}

impl Related<super::stock_taking_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
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
