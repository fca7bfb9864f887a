use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cycle-count plan lifecycle.
///
/// Generating the plan's lines snapshots book quantities and moves the plan
/// to `Counting`; it completes when every line is Adjusted or Excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakingPlanStatus {
    Draft,
    Counting,
    Completed,
    Cancelled,
}

impl TakingPlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakingPlanStatus::Draft => "draft",
            TakingPlanStatus::Counting => "counting",
            TakingPlanStatus::Completed => "completed",
            TakingPlanStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TakingPlanStatus::Draft),
            "counting" => Some(TakingPlanStatus::Counting),
            "completed" => Some(TakingPlanStatus::Completed),
            "cancelled" => Some(TakingPlanStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition(&self, to: TakingPlanStatus) -> bool {
        use TakingPlanStatus::*;
        matches!(
            (self, to),
            (Draft, Counting) | (Counting, Completed) | (Draft, Cancelled) | (Counting, Cancelled)
        )
    }
}

/// Count scope: warehouse-wide, narrowed by location and/or goods when set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_taking_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub plan_no: String,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub goods_id: Option<Uuid>,
    pub status: String,
    pub line_count: i32,
    pub completed_count: i32,
    pub diff_count: i32,
    pub remark: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<TakingPlanStatus> {
        TakingPlanStatus::parse(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_taking_line::Entity")]
    Lines,
}

impl Related<super::stock_taking_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
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
