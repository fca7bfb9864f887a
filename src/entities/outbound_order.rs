use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipping order lifecycle.
///
/// Entering `Picking` reserves plan quantity per line; `Completed` consumes
/// shipped quantity against those reservations. Cancellation from any
/// non-terminal state releases whatever hold the lines still carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundStatus {
    Draft,
    Audited,
    Picking,
    AwaitingShipment,
    Completed,
    Cancelled,
}

impl OutboundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundStatus::Draft => "draft",
            OutboundStatus::Audited => "audited",
            OutboundStatus::Picking => "picking",
            OutboundStatus::AwaitingShipment => "awaiting_shipment",
            OutboundStatus::Completed => "completed",
            OutboundStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(OutboundStatus::Draft),
            "audited" => Some(OutboundStatus::Audited),
            "picking" => Some(OutboundStatus::Picking),
            "awaiting_shipment" => Some(OutboundStatus::AwaitingShipment),
            "completed" => Some(OutboundStatus::Completed),
            "cancelled" => Some(OutboundStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboundStatus::Completed | OutboundStatus::Cancelled)
    }

    pub fn can_transition(&self, to: OutboundStatus) -> bool {
        use OutboundStatus::*;
        matches!(
            (self, to),
            (Draft, Audited)
                | (Audited, Picking)
                | (Picking, AwaitingShipment)
                | (AwaitingShipment, Completed)
                | (Draft, Cancelled)
                | (Audited, Cancelled)
                | (Picking, Cancelled)
                | (AwaitingShipment, Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbound_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub outbound_no: String,
    pub warehouse_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub status: String,
    /// Active picking wave this order belongs to, at most one at a time.
    pub wave_id: Option<Uuid>,
    pub remark: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<OutboundStatus> {
        OutboundStatus::parse(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::outbound_item::Entity")]
    Items,
}

impl Related<super::outbound_item::Entity> for Entity {
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
        use OutboundStatus::*;
        assert!(Draft.can_transition(Audited));
        assert!(Audited.can_transition(Picking));
        assert!(Picking.can_transition(AwaitingShipment));
        assert!(AwaitingShipment.can_transition(Completed));
        assert!(Picking.can_transition(Cancelled));
        assert!(!Completed.can_transition(Cancelled));
        assert!(!Draft.can_transition(Picking));
        assert!(!Cancelled.can_transition(Picking));
    }

    #[test]
    fn status_round_trip() {
        for s in [
            OutboundStatus::Draft,
            OutboundStatus::Audited,
            OutboundStatus::Picking,
            OutboundStatus::AwaitingShipment,
            OutboundStatus::Completed,
            OutboundStatus::Cancelled,
        ] {
            assert_eq!(OutboundStatus::parse(s.as_str()), Some(s));
        }
    }
}
