//! Inbound (receiving) workflow
//!
//! Draft -> Audited -> Receiving -> Completed, Cancelled from any
//! non-terminal state. Stock is touched exactly once, at completion: one
//! INBOUND posting of the qualified quantity per item. Unqualified
//! quantity stays on the item and never reaches the stock store.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inbound_item::{self, Entity as InboundItemEntity};
use crate::entities::inbound_order::{self, Entity as InboundOrderEntity, InboundStatus};
use crate::entities::inventory_log::OperationType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::{StockPosting, StockStore};

pub const BUSINESS_TYPE_INBOUND: &str = "inbound";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInboundCommand {
    #[validate(length(min = 1, max = 64))]
    pub inbound_no: String,
    pub warehouse_id: Uuid,
    pub supplier_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub items: Vec<InboundItemInput>,
    #[validate(length(max = 500))]
    pub remark: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InboundItemInput {
    pub goods_id: Uuid,
    pub location_id: Uuid,
    #[validate(length(max = 64))]
    pub batch_no: String,
    pub expire_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub plan_quantity: i32,
}

/// One partial receipt against an item, quality-checked on the dock:
/// `quantity = qualified_quantity + unqualified_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptLine {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub qualified_quantity: i32,
    #[validate(range(min = 0))]
    pub unqualified_quantity: i32,
}

#[derive(Clone)]
pub struct InboundService {
    db: Arc<DatabaseConnection>,
    stock: StockStore,
    event_sender: EventSender,
}

impl InboundService {
    pub fn new(db: Arc<DatabaseConnection>, stock: StockStore, event_sender: EventSender) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    /// Creates a draft order with its items.
    #[instrument(skip(self, cmd), fields(inbound_no = %cmd.inbound_no))]
    pub async fn create(
        &self,
        cmd: CreateInboundCommand,
    ) -> Result<inbound_order::Model, ServiceError> {
        cmd.validate()?;
        for item in &cmd.items {
            item.validate()?;
        }

        let order = self
            .db
            .transaction::<_, inbound_order::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let header = inbound_order::ActiveModel {
                        inbound_no: Set(cmd.inbound_no.clone()),
                        warehouse_id: Set(cmd.warehouse_id),
                        supplier_id: Set(cmd.supplier_id),
                        status: Set(InboundStatus::Draft.as_str().to_string()),
                        remark: Set(cmd.remark.clone()),
                        created_by: Set(cmd.operator.clone()),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await?;

                    for (idx, item) in cmd.items.iter().enumerate() {
                        let line = inbound_item::ActiveModel {
                            inbound_id: Set(header.id),
                            line_no: Set(idx as i32 + 1),
                            goods_id: Set(item.goods_id),
                            location_id: Set(item.location_id),
                            batch_no: Set(item.batch_no.clone()),
                            expire_date: Set(item.expire_date),
                            plan_quantity: Set(item.plan_quantity),
                            received_quantity: Set(0),
                            qualified_quantity: Set(0),
                            unqualified_quantity: Set(0),
                            ..Default::default()
                        };
                        line.insert(txn).await?;
                    }
                    Ok(header)
                })
            })
            .await?;

        info!(inbound_no = %order.inbound_no, "inbound order created");
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<inbound_order::Model, ServiceError> {
        self.load(id).await
    }

    pub async fn items(&self, id: Uuid) -> Result<Vec<inbound_item::Model>, ServiceError> {
        let items = InboundItemEntity::find()
            .filter(inbound_item::Column::InboundId.eq(id))
            .order_by_asc(inbound_item::Column::LineNo)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Draft -> Audited. No stock effect.
    #[instrument(skip(self), fields(inbound_id = %id))]
    pub async fn audit(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        self.transition(id, InboundStatus::Audited, operator).await
    }

    /// Records partial receipts. Enters Receiving on the first receipt;
    /// accrues received/qualified/unqualified on items with no stock
    /// posting.
    #[instrument(skip(self, receipts), fields(inbound_id = %id, lines = receipts.len()))]
    pub async fn receive(
        &self,
        id: Uuid,
        receipts: Vec<ReceiptLine>,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        if receipts.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one receipt line is required".to_string(),
            ));
        }
        for line in &receipts {
            line.validate()?;
            if line.qualified_quantity + line.unqualified_quantity != line.quantity {
                return Err(ServiceError::ValidationError(format!(
                    "Receipt for item {} does not split into qualified {} + unqualified {}",
                    line.item_id, line.qualified_quantity, line.unqualified_quantity
                )));
            }
        }

        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        match status {
            InboundStatus::Audited | InboundStatus::Receiving => {}
            other => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Inbound {} cannot receive in status {}",
                    order.inbound_no,
                    other.as_str()
                )))
            }
        }

        let operator = operator.to_string();
        let old_status = status;
        let order = self
            .db
            .transaction::<_, inbound_order::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    for line in &receipts {
                        let item = InboundItemEntity::find_by_id(line.item_id)
                            .one(txn)
                            .await?
                            .filter(|item| item.inbound_id == order.id)
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Inbound item {} not found on order {}",
                                    line.item_id, order.inbound_no
                                ))
                            })?;

                        let received = item.received_quantity + line.quantity;
                        if received > item.plan_quantity {
                            return Err(ServiceError::ValidationError(format!(
                                "Receipt would exceed plan quantity {} for item {}",
                                item.plan_quantity, item.id
                            )));
                        }
                        let qualified = item.qualified_quantity + line.qualified_quantity;
                        let unqualified = item.unqualified_quantity + line.unqualified_quantity;

                        let mut active: inbound_item::ActiveModel = item.into();
                        active.received_quantity = Set(received);
                        active.qualified_quantity = Set(qualified);
                        active.unqualified_quantity = Set(unqualified);
                        active.update(txn).await?;
                    }

                    let mut active: inbound_order::ActiveModel = order.into();
                    active.status = Set(InboundStatus::Receiving.as_str().to_string());
                    active.updated_by = Set(Some(operator.clone()));
                    let order = active.update(txn).await?;
                    Ok(order)
                })
            })
            .await?;

        if old_status != InboundStatus::Receiving {
            self.publish_status_change(&order, old_status, InboundStatus::Receiving)
                .await;
        }
        Ok(order)
    }

    /// Receiving -> Completed. Posts one INBOUND adjustment of the
    /// qualified quantity per item, all-or-nothing; items without any
    /// qualified quantity post nothing.
    #[instrument(skip(self), fields(inbound_id = %id))]
    pub async fn complete(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(InboundStatus::Completed) {
            return Err(ServiceError::InvalidTransition(format!(
                "Inbound {} cannot complete from status {}",
                order.inbound_no,
                status.as_str()
            )));
        }

        let items = self.items(order.id).await?;
        let postings: Vec<StockPosting> = items
            .iter()
            .filter(|item| item.qualified_quantity > 0)
            .map(|item| StockPosting {
                key: item.stock_key(order.warehouse_id),
                quantity: item.qualified_quantity,
                operation_type: OperationType::Inbound,
                business_type: BUSINESS_TYPE_INBOUND.to_string(),
                business_no: order.inbound_no.clone(),
                business_line: item.id.to_string(),
                operator: operator.to_string(),
                expire_date: item.expire_date,
            })
            .collect();

        // Postings commit first; a crash before the status write below is
        // healed on retry because every posting is idempotent.
        self.stock.adjust_batch(postings).await?;

        let order = self
            .update_status(order, InboundStatus::Completed, operator)
            .await?;
        self.publish_status_change(&order, status, InboundStatus::Completed)
            .await;
        Ok(order)
    }

    /// Cancels from any non-terminal state; posts nothing. Cancelling an
    /// already-cancelled order is a no-op so retries are safe.
    #[instrument(skip(self), fields(inbound_id = %id))]
    pub async fn cancel(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if status == InboundStatus::Cancelled {
            return Ok(order);
        }
        if !status.can_transition(InboundStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition(format!(
                "Inbound {} cannot cancel from status {}",
                order.inbound_no,
                status.as_str()
            )));
        }
        let order = self
            .update_status(order, InboundStatus::Cancelled, operator)
            .await?;
        self.publish_status_change(&order, status, InboundStatus::Cancelled)
            .await;
        Ok(order)
    }

    /// Soft-deletes a non-terminal order after cancelling it. The header
    /// row and its lines stay in place for audit continuity, hidden from
    /// every query that honors `deleted_at`.
    #[instrument(skip(self), fields(inbound_id = %id))]
    pub async fn delete(&self, id: Uuid, operator: &str) -> Result<(), ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if status == InboundStatus::Completed {
            return Err(ServiceError::InvalidTransition(format!(
                "Inbound {} is completed and cannot be deleted",
                order.inbound_no
            )));
        }
        let order = if status == InboundStatus::Cancelled {
            order
        } else {
            self.cancel(id, operator).await?
        };

        let mut active: inbound_order::ActiveModel = order.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.updated_by = Set(Some(operator.to_string()));
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<inbound_order::Model, ServiceError> {
        InboundOrderEntity::find_by_id(id)
            .filter(inbound_order::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inbound order {} not found", id)))
    }

    async fn transition(
        &self,
        id: Uuid,
        to: InboundStatus,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(to) {
            return Err(ServiceError::InvalidTransition(format!(
                "Inbound {} cannot go from {} to {}",
                order.inbound_no,
                status.as_str(),
                to.as_str()
            )));
        }
        let order = self.update_status(order, to, operator).await?;
        self.publish_status_change(&order, status, to).await;
        Ok(order)
    }

    async fn update_status(
        &self,
        order: inbound_order::Model,
        to: InboundStatus,
        operator: &str,
    ) -> Result<inbound_order::Model, ServiceError> {
        let mut active: inbound_order::ActiveModel = order.into();
        active.status = Set(to.as_str().to_string());
        active.updated_by = Set(Some(operator.to_string()));
        let order = active.update(&*self.db).await?;
        info!(inbound_no = %order.inbound_no, status = to.as_str(), "inbound status updated");
        Ok(order)
    }

    async fn publish_status_change(
        &self,
        order: &inbound_order::Model,
        from: InboundStatus,
        to: InboundStatus,
    ) {
        self.event_sender
            .send_or_log(Event::InboundStatusChanged {
                inbound_id: order.id,
                inbound_no: order.inbound_no.clone(),
                old_status: from.as_str().to_string(),
                new_status: to.as_str().to_string(),
            })
            .await;
    }
}

fn parse_status(order: &inbound_order::Model) -> Result<InboundStatus, ServiceError> {
    order.status().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Inbound {} carries unknown status '{}'",
            order.inbound_no, order.status
        ))
    })
}
