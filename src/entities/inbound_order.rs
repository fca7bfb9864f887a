use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiving order lifecycle.
///
/// Stock is only posted at `Completed`; everything before that is paperwork
/// plus accrual of received quantities on the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundStatus {
    Draft,
    Audited,
    Receiving,
    Completed,
    Cancelled,
}

impl InboundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboundStatus::Draft => "draft",
            InboundStatus::Audited => "audited",
            InboundStatus::Receiving => "receiving",
            InboundStatus::Completed => "completed",
            InboundStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InboundStatus::Draft),
            "audited" => Some(InboundStatus::Audited),
            "receiving" => Some(InboundStatus::Receiving),
            "completed" => Some(InboundStatus::Completed),
            "cancelled" => Some(InboundStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InboundStatus::Completed | InboundStatus::Cancelled)
    }

    pub fn can_transition(&self, to: InboundStatus) -> bool {
        use InboundStatus::*;
        matches!(
            (self, to),
            (Draft, Audited)
                | (Audited, Receiving)
                | (Receiving, Completed)
                | (Draft, Cancelled)
                | (Audited, Cancelled)
                | (Receiving, Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub inbound_no: String,
    pub warehouse_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub status: String,
    pub remark: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<InboundStatus> {
        InboundStatus::parse(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inbound_item::Entity")]
    Items,
}

impl Related<super::inbound_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use InboundStatus::*;
        assert!(Draft.can_transition(Audited));
        assert!(Audited.can_transition(Receiving));
        assert!(Receiving.can_transition(Completed));
        assert!(Receiving.can_transition(Cancelled));
        assert!(!Draft.can_transition(Receiving));
        assert!(!Completed.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Audited));
    }
}
