//! Outbound (shipping) workflow
//!
//! Draft -> Audited -> Picking -> AwaitingShipment -> Completed, Cancelled
//! from any non-terminal state. Entering Picking reserves each line's plan
//! quantity; completion consumes what shipped and releases the rest; every
//! cancellation path releases exactly the hold still recorded on the
//! lines, inside the transaction that zeroes those lines, which is what
//! makes it safe to run twice.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_log::OperationType;
use crate::entities::outbound_item::{self, Entity as OutboundItemEntity};
use crate::entities::outbound_order::{self, Entity as OutboundOrderEntity, OutboundStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::{PostingResult, StockOp, StockPosting, StockStore};

pub const BUSINESS_TYPE_OUTBOUND: &str = "outbound";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOutboundCommand {
    #[validate(length(min = 1, max = 64))]
    pub outbound_no: String,
    pub warehouse_id: Uuid,
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub items: Vec<OutboundItemInput>,
    #[validate(length(max = 500))]
    pub remark: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutboundItemInput {
    pub goods_id: Uuid,
    pub location_id: Uuid,
    #[validate(length(max = 64))]
    pub batch_no: String,
    #[validate(range(min = 1))]
    pub plan_quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PickLine {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShipLine {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Clone)]
pub struct OutboundService {
    db: Arc<DatabaseConnection>,
    stock: StockStore,
    event_sender: EventSender,
}

impl OutboundService {
    pub fn new(db: Arc<DatabaseConnection>, stock: StockStore, event_sender: EventSender) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    /// Creates a draft order with its items.
    #[instrument(skip(self, cmd), fields(outbound_no = %cmd.outbound_no))]
    pub async fn create(
        &self,
        cmd: CreateOutboundCommand,
    ) -> Result<outbound_order::Model, ServiceError> {
        cmd.validate()?;
        for item in &cmd.items {
            item.validate()?;
        }

        let order = self
            .db
            .transaction::<_, outbound_order::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let header = outbound_order::ActiveModel {
                        outbound_no: Set(cmd.outbound_no.clone()),
                        warehouse_id: Set(cmd.warehouse_id),
                        customer_id: Set(cmd.customer_id),
                        status: Set(OutboundStatus::Draft.as_str().to_string()),
                        wave_id: Set(None),
                        remark: Set(cmd.remark.clone()),
                        created_by: Set(cmd.operator.clone()),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await?;

                    for (idx, item) in cmd.items.iter().enumerate() {
                        let line = outbound_item::ActiveModel {
                            outbound_id: Set(header.id),
                            line_no: Set(idx as i32 + 1),
                            goods_id: Set(item.goods_id),
                            location_id: Set(item.location_id),
                            batch_no: Set(item.batch_no.clone()),
                            plan_quantity: Set(item.plan_quantity),
                            picked_quantity: Set(0),
                            shipped_quantity: Set(0),
                            reserved_quantity: Set(0),
                            ..Default::default()
                        };
                        line.insert(txn).await?;
                    }
                    Ok(header)
                })
            })
            .await?;

        info!(outbound_no = %order.outbound_no, "outbound order created");
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<outbound_order::Model, ServiceError> {
        self.load(id).await
    }

    pub async fn items(&self, id: Uuid) -> Result<Vec<outbound_item::Model>, ServiceError> {
        let items = OutboundItemEntity::find()
            .filter(outbound_item::Column::OutboundId.eq(id))
            .order_by_asc(outbound_item::Column::LineNo)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Draft -> Audited. No stock effect.
    #[instrument(skip(self), fields(outbound_id = %id))]
    pub async fn audit(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(OutboundStatus::Audited) {
            return Err(invalid_transition(&order, status, OutboundStatus::Audited));
        }
        let order = self
            .update_status(order, OutboundStatus::Audited, operator)
            .await?;
        self.publish_status_change(&order, status, OutboundStatus::Audited)
            .await;
        Ok(order)
    }

    /// Audited -> Picking. Reserves every line's plan quantity and records
    /// the hold on the line, all in one transaction: either the whole
    /// order enters picking fully reserved, or nothing changes.
    #[instrument(skip(self), fields(outbound_id = %id))]
    pub async fn start_picking(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(OutboundStatus::Picking) {
            return Err(invalid_transition(&order, status, OutboundStatus::Picking));
        }

        let items = self.items(order.id).await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Outbound {} has no items to pick",
                order.outbound_no
            )));
        }

        let ops: Vec<StockOp> = items
            .iter()
            .map(|item| StockOp::Reserve {
                key: item.stock_key(order.warehouse_id),
                amount: item.plan_quantity,
            })
            .collect();

        let guards = self.stock.lock_ops(&ops).await;
        let operator_owned = operator.to_string();
        let ops_for_txn = ops.clone();
        let (order, results) = self
            .db
            .transaction::<_, (outbound_order::Model, Vec<PostingResult>), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut results = Vec::with_capacity(ops_for_txn.len());
                    for op in &ops_for_txn {
                        results.push(StockStore::apply_in_txn(txn, op).await?);
                    }

                    for item in items {
                        let plan = item.plan_quantity;
                        let mut active: outbound_item::ActiveModel = item.into();
                        active.reserved_quantity = Set(plan);
                        active.update(txn).await?;
                    }

                    let mut active: outbound_order::ActiveModel = order.into();
                    active.status = Set(OutboundStatus::Picking.as_str().to_string());
                    active.updated_by = Set(Some(operator_owned));
                    let order = active.update(txn).await?;
                    Ok((order, results))
                })
            })
            .await?;
        drop(guards);

        self.stock.publish_op_events(&ops, &results).await;
        self.publish_status_change(&order, status, OutboundStatus::Picking)
            .await;
        Ok(order)
    }

    /// Accrues picked quantity on lines while the order is in Picking.
    /// Picks never exceed the line's plan; no stock effect.
    #[instrument(skip(self, picks), fields(outbound_id = %id, lines = picks.len()))]
    pub async fn record_pick(
        &self,
        id: Uuid,
        picks: Vec<PickLine>,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        if picks.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one pick line is required".to_string(),
            ));
        }
        for pick in &picks {
            pick.validate()?;
        }

        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if status != OutboundStatus::Picking {
            return Err(ServiceError::InvalidTransition(format!(
                "Outbound {} cannot record picks in status {}",
                order.outbound_no,
                status.as_str()
            )));
        }

        let order_id = order.id;
        let outbound_no = order.outbound_no.clone();
        let operator = operator.to_string();
        let order = self
            .db
            .transaction::<_, outbound_order::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    for pick in &picks {
                        let item = OutboundItemEntity::find_by_id(pick.item_id)
                            .one(txn)
                            .await?
                            .filter(|item| item.outbound_id == order_id)
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Outbound item {} not found on order {}",
                                    pick.item_id, outbound_no
                                ))
                            })?;

                        let picked = item.picked_quantity + pick.quantity;
                        if picked > item.plan_quantity {
                            return Err(ServiceError::ValidationError(format!(
                                "Pick would exceed plan quantity {} for item {}",
                                item.plan_quantity, item.id
                            )));
                        }
                        let mut active: outbound_item::ActiveModel = item.into();
                        active.picked_quantity = Set(picked);
                        active.update(txn).await?;
                    }

                    let mut active: outbound_order::ActiveModel = order.into();
                    active.updated_by = Set(Some(operator));
                    let order = active.update(txn).await?;
                    Ok(order)
                })
            })
            .await?;
        Ok(order)
    }

    /// Picking -> AwaitingShipment.
    #[instrument(skip(self), fields(outbound_id = %id))]
    pub async fn mark_ready(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(OutboundStatus::AwaitingShipment) {
            return Err(invalid_transition(
                &order,
                status,
                OutboundStatus::AwaitingShipment,
            ));
        }
        let order = self
            .update_status(order, OutboundStatus::AwaitingShipment, operator)
            .await?;
        self.publish_status_change(&order, status, OutboundStatus::AwaitingShipment)
            .await;
        Ok(order)
    }

    /// AwaitingShipment -> Completed. Consumes each shipped quantity
    /// against the line's hold and releases whatever hold is left, as one
    /// all-or-nothing transaction: a single over-shipped line aborts the
    /// whole completion with every leg rolled back.
    #[instrument(skip(self, ships), fields(outbound_id = %id, lines = ships.len()))]
    pub async fn complete(
        &self,
        id: Uuid,
        ships: Vec<ShipLine>,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        for ship in &ships {
            ship.validate()?;
        }

        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if !status.can_transition(OutboundStatus::Completed) {
            return Err(invalid_transition(&order, status, OutboundStatus::Completed));
        }

        let items = self.items(order.id).await?;
        let mut shipped_by_item: std::collections::HashMap<Uuid, i32> = std::collections::HashMap::new();
        for ship in &ships {
            if !items.iter().any(|item| item.id == ship.item_id) {
                return Err(ServiceError::NotFound(format!(
                    "Outbound item {} not found on order {}",
                    ship.item_id, order.outbound_no
                )));
            }
            *shipped_by_item.entry(ship.item_id).or_insert(0) += ship.quantity;
        }

        // Build the stock legs: consume what shipped, release the rest of
        // each line's hold.
        let mut ops: Vec<StockOp> = Vec::new();
        let mut updates: Vec<(outbound_item::Model, i32)> = Vec::new();
        for item in items {
            let shipped = shipped_by_item.get(&item.id).copied().unwrap_or(0);
            if shipped > item.reserved_quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Shipment of {} exceeds reserved {} for item {}",
                    shipped, item.reserved_quantity, item.id
                )));
            }
            let key = item.stock_key(order.warehouse_id);
            if shipped > 0 {
                ops.push(StockOp::Consume(StockPosting {
                    key: key.clone(),
                    quantity: shipped,
                    operation_type: OperationType::Outbound,
                    business_type: BUSINESS_TYPE_OUTBOUND.to_string(),
                    business_no: order.outbound_no.clone(),
                    business_line: item.id.to_string(),
                    operator: operator.to_string(),
                    expire_date: None,
                }));
            }
            let leftover = item.reserved_quantity - shipped;
            if leftover > 0 {
                ops.push(StockOp::Release {
                    key,
                    amount: leftover,
                });
            }
            updates.push((item, shipped));
        }

        let guards = self.stock.lock_ops(&ops).await;
        let operator_owned = operator.to_string();
        let ops_for_txn = ops.clone();
        let (order, results) = self
            .db
            .transaction::<_, (outbound_order::Model, Vec<PostingResult>), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut results = Vec::with_capacity(ops_for_txn.len());
                    for op in &ops_for_txn {
                        results.push(StockStore::apply_in_txn(txn, op).await?);
                    }

                    for (item, shipped) in updates {
                        let mut active: outbound_item::ActiveModel = item.into();
                        active.shipped_quantity = Set(shipped);
                        active.reserved_quantity = Set(0);
                        active.update(txn).await?;
                    }

                    let mut active: outbound_order::ActiveModel = order.into();
                    active.status = Set(OutboundStatus::Completed.as_str().to_string());
                    active.updated_by = Set(Some(operator_owned));
                    let order = active.update(txn).await?;
                    Ok((order, results))
                })
            })
            .await?;
        drop(guards);

        self.stock.publish_op_events(&ops, &results).await;
        self.publish_status_change(&order, status, OutboundStatus::Completed)
            .await;
        Ok(order)
    }

    /// Cancels from any non-terminal state, releasing the hold still
    /// recorded on every line. The release and the zeroing of the lines
    /// share one transaction, so running cancel twice releases nothing the
    /// second time; cancelling an already-cancelled order is a no-op.
    #[instrument(skip(self), fields(outbound_id = %id))]
    pub async fn cancel(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if status == OutboundStatus::Cancelled {
            return Ok(order);
        }
        if !status.can_transition(OutboundStatus::Cancelled) {
            return Err(invalid_transition(&order, status, OutboundStatus::Cancelled));
        }

        let items = self.items(order.id).await?;
        let ops: Vec<StockOp> = items
            .iter()
            .filter(|item| item.reserved_quantity > 0)
            .map(|item| StockOp::Release {
                key: item.stock_key(order.warehouse_id),
                amount: item.reserved_quantity,
            })
            .collect();

        let guards = self.stock.lock_ops(&ops).await;
        let operator_owned = operator.to_string();
        let ops_for_txn = ops.clone();
        let (order, results) = self
            .db
            .transaction::<_, (outbound_order::Model, Vec<PostingResult>), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut results = Vec::with_capacity(ops_for_txn.len());
                    for op in &ops_for_txn {
                        results.push(StockStore::apply_in_txn(txn, op).await?);
                    }

                    for item in items {
                        if item.reserved_quantity == 0 {
                            continue;
                        }
                        let mut active: outbound_item::ActiveModel = item.into();
                        active.reserved_quantity = Set(0);
                        active.update(txn).await?;
                    }

                    let mut active: outbound_order::ActiveModel = order.into();
                    active.status = Set(OutboundStatus::Cancelled.as_str().to_string());
                    active.updated_by = Set(Some(operator_owned));
                    let order = active.update(txn).await?;
                    Ok((order, results))
                })
            })
            .await?;
        drop(guards);

        self.stock.publish_op_events(&ops, &results).await;
        self.publish_status_change(&order, status, OutboundStatus::Cancelled)
            .await;
        Ok(order)
    }

    /// Soft-deletes a non-terminal order after cancelling it (which
    /// releases any holds). Rows stay for audit continuity.
    #[instrument(skip(self), fields(outbound_id = %id))]
    pub async fn delete(&self, id: Uuid, operator: &str) -> Result<(), ServiceError> {
        let order = self.load(id).await?;
        let status = parse_status(&order)?;
        if status == OutboundStatus::Completed {
            return Err(ServiceError::InvalidTransition(format!(
                "Outbound {} is completed and cannot be deleted",
                order.outbound_no
            )));
        }
        let order = if status == OutboundStatus::Cancelled {
            order
        } else {
            self.cancel(id, operator).await?
        };

        let mut active: outbound_order::ActiveModel = order.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.updated_by = Set(Some(operator.to_string()));
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<outbound_order::Model, ServiceError> {
        OutboundOrderEntity::find_by_id(id)
            .filter(outbound_order::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Outbound order {} not found", id)))
    }

    async fn update_status(
        &self,
        order: outbound_order::Model,
        to: OutboundStatus,
        operator: &str,
    ) -> Result<outbound_order::Model, ServiceError> {
        let mut active: outbound_order::ActiveModel = order.into();
        active.status = Set(to.as_str().to_string());
        active.updated_by = Set(Some(operator.to_string()));
        let order = active.update(&*self.db).await?;
        info!(outbound_no = %order.outbound_no, status = to.as_str(), "outbound status updated");
        Ok(order)
    }

    async fn publish_status_change(
        &self,
        order: &outbound_order::Model,
        from: OutboundStatus,
        to: OutboundStatus,
    ) {
        self.event_sender
            .send_or_log(Event::OutboundStatusChanged {
                outbound_id: order.id,
                outbound_no: order.outbound_no.clone(),
                old_status: from.as_str().to_string(),
                new_status: to.as_str().to_string(),
            })
            .await;
    }
}

fn parse_status(order: &outbound_order::Model) -> Result<OutboundStatus, ServiceError> {
    order.status().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Outbound {} carries unknown status '{}'",
            order.outbound_no, order.status
        ))
    })
}

fn invalid_transition(
    order: &outbound_order::Model,
    from: OutboundStatus,
    to: OutboundStatus,
) -> ServiceError {
    ServiceError::InvalidTransition(format!(
        "Outbound {} cannot go from {} to {}",
        order.outbound_no,
        from.as_str(),
        to.as_str()
    ))
}
