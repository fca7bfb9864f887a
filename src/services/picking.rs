//! Picking wave workflow
//!
//! A wave batches outbound orders that are mid-picking: creation claims
//! each order (one active wave per order, enforced on the order's
//! `wave_id`) and emits one task per distinct (location, goods, batch)
//! across the member orders, summing their outstanding quantity. Task
//! completion feeds picked quantity back into the member orders' lines in
//! plan order. The wave's status aggregates its tasks: Completed only when
//! every task is Completed or Cancelled.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::outbound_item::{self, Entity as OutboundItemEntity};
use crate::entities::outbound_order::{self, Entity as OutboundOrderEntity, OutboundStatus};
use crate::entities::picking_task::{self, Entity as PickingTaskEntity, TaskStatus};
use crate::entities::picking_wave::{self, Entity as PickingWaveEntity, WaveStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWaveCommand {
    #[validate(length(min = 1, max = 64))]
    pub wave_no: String,
    pub warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub outbound_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub operator: String,
}

#[derive(Clone)]
pub struct PickingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PickingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Claims the given outbound orders and generates the wave's tasks.
    ///
    /// Orders must be in Picking, unclaimed, and in the wave's warehouse.
    /// Tasks aggregate the orders' outstanding (unpicked) quantities per
    /// (location, goods, batch); fully picked orders contribute nothing.
    #[instrument(skip(self, cmd), fields(wave_no = %cmd.wave_no, orders = cmd.outbound_ids.len()))]
    pub async fn create_wave(
        &self,
        cmd: CreateWaveCommand,
    ) -> Result<picking_wave::Model, ServiceError> {
        cmd.validate()?;

        let mut orders = Vec::with_capacity(cmd.outbound_ids.len());
        for id in &cmd.outbound_ids {
            let order = OutboundOrderEntity::find_by_id(*id)
                .filter(outbound_order::Column::DeletedAt.is_null())
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Outbound order {} not found", id))
                })?;
            if order.warehouse_id != cmd.warehouse_id {
                return Err(ServiceError::ValidationError(format!(
                    "Outbound {} belongs to another warehouse",
                    order.outbound_no
                )));
            }
            if order.status() != Some(OutboundStatus::Picking) {
                return Err(ServiceError::InvalidTransition(format!(
                    "Outbound {} is not picking and cannot join a wave",
                    order.outbound_no
                )));
            }
            if order.wave_id.is_some() {
                return Err(ServiceError::ValidationError(format!(
                    "Outbound {} already belongs to an active wave",
                    order.outbound_no
                )));
            }
            orders.push(order);
        }

        // Aggregate outstanding quantity per (location, goods, batch).
        let mut demand: BTreeMap<(Uuid, Uuid, String), i32> = BTreeMap::new();
        for order in &orders {
            let items = OutboundItemEntity::find()
                .filter(outbound_item::Column::OutboundId.eq(order.id))
                .all(&*self.db)
                .await?;
            for item in items {
                let outstanding = item.outstanding();
                if outstanding > 0 {
                    *demand
                        .entry((item.location_id, item.goods_id, item.batch_no.clone()))
                        .or_insert(0) += outstanding;
                }
            }
        }

        let warehouse_id = cmd.warehouse_id;
        let wave_no = cmd.wave_no.clone();
        let operator = cmd.operator.clone();
        let order_count = orders.len() as i32;
        let wave = self
            .db
            .transaction::<_, picking_wave::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let task_count = demand.len() as i32;
                    let wave = picking_wave::ActiveModel {
                        wave_no: Set(wave_no),
                        warehouse_id: Set(warehouse_id),
                        status: Set(WaveStatus::Pending.as_str().to_string()),
                        order_count: Set(order_count),
                        task_count: Set(task_count),
                        created_by: Set(operator),
                        ..Default::default()
                    };
                    let wave = wave.insert(txn).await?;

                    for order in orders {
                        let mut active: outbound_order::ActiveModel = order.into();
                        active.wave_id = Set(Some(wave.id));
                        active.update(txn).await?;
                    }

                    for ((location_id, goods_id, batch_no), required) in demand {
                        let task = picking_task::ActiveModel {
                            wave_id: Set(wave.id),
                            warehouse_id: Set(warehouse_id),
                            goods_id: Set(goods_id),
                            location_id: Set(location_id),
                            batch_no: Set(batch_no),
                            required_quantity: Set(required),
                            picked_quantity: Set(0),
                            status: Set(TaskStatus::Pending.as_str().to_string()),
                            ..Default::default()
                        };
                        task.insert(txn).await?;
                    }
                    Ok(wave)
                })
            })
            .await?;

        self.event_sender
            .send_or_log(Event::WaveGenerated {
                wave_id: wave.id,
                wave_no: wave.wave_no.clone(),
                order_count: wave.order_count,
                task_count: wave.task_count,
            })
            .await;
        info!(wave_no = %wave.wave_no, tasks = wave.task_count, "picking wave generated");
        Ok(wave)
    }

    pub async fn get_wave(&self, id: Uuid) -> Result<picking_wave::Model, ServiceError> {
        self.load_wave(id).await
    }

    pub async fn tasks(&self, wave_id: Uuid) -> Result<Vec<picking_task::Model>, ServiceError> {
        let tasks = PickingTaskEntity::find()
            .filter(picking_task::Column::WaveId.eq(wave_id))
            .all(&*self.db)
            .await?;
        Ok(tasks)
    }

    /// Completes one task and distributes the picked quantity over the
    /// member orders' matching lines, oldest order first, never past a
    /// line's plan. Rolls the wave forward when this was the last open
    /// task.
    #[instrument(skip(self), fields(task_id = %task_id, picked = picked_quantity))]
    pub async fn complete_task(
        &self,
        task_id: Uuid,
        picked_quantity: i32,
        operator: &str,
    ) -> Result<picking_task::Model, ServiceError> {
        if picked_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Picked quantity must not be negative".to_string(),
            ));
        }
        let task = self.load_task(task_id).await?;
        if picked_quantity > task.required_quantity {
            return Err(ServiceError::ValidationError(format!(
                "Picked {} exceeds required {} for task {}",
                picked_quantity, task.required_quantity, task.id
            )));
        }
        if task.status() != Some(TaskStatus::Pending) {
            return Err(ServiceError::InvalidTransition(format!(
                "Picking task {} is not pending",
                task.id
            )));
        }
        let wave = self.load_wave(task.wave_id).await?;
        match wave.status() {
            Some(WaveStatus::Pending) | Some(WaveStatus::InProgress) => {}
            _ => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Wave {} is not open for picking",
                    wave.wave_no
                )))
            }
        }

        // Member orders' matching lines, oldest claim first.
        let member_orders = OutboundOrderEntity::find()
            .filter(outbound_order::Column::WaveId.eq(wave.id))
            .order_by_asc(outbound_order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let operator = operator.to_string();
        let (task, wave_done) = self
            .db
            .transaction::<_, (picking_task::Model, bool), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut remaining = picked_quantity;
                    for order in &member_orders {
                        if remaining == 0 {
                            break;
                        }
                        let items = OutboundItemEntity::find()
                            .filter(outbound_item::Column::OutboundId.eq(order.id))
                            .filter(outbound_item::Column::GoodsId.eq(task.goods_id))
                            .filter(outbound_item::Column::LocationId.eq(task.location_id))
                            .filter(outbound_item::Column::BatchNo.eq(task.batch_no.clone()))
                            .order_by_asc(outbound_item::Column::LineNo)
                            .all(txn)
                            .await?;
                        for item in items {
                            if remaining == 0 {
                                break;
                            }
                            let fill = remaining.min(item.outstanding());
                            if fill <= 0 {
                                continue;
                            }
                            let picked = item.picked_quantity + fill;
                            let mut active: outbound_item::ActiveModel = item.into();
                            active.picked_quantity = Set(picked);
                            active.update(txn).await?;
                            remaining -= fill;
                        }
                    }

                    let mut active: picking_task::ActiveModel = task.into();
                    active.picked_quantity = Set(picked_quantity);
                    active.status = Set(TaskStatus::Completed.as_str().to_string());
                    active.picked_by = Set(Some(operator.clone()));
                    let task = active.update(txn).await?;

                    // Aggregate the wave from its tasks.
                    let open_tasks = PickingTaskEntity::find()
                        .filter(picking_task::Column::WaveId.eq(task.wave_id))
                        .filter(picking_task::Column::Status.eq(TaskStatus::Pending.as_str()))
                        .all(txn)
                        .await?;
                    let wave_done = open_tasks.is_empty();
                    let mut active: picking_wave::ActiveModel = wave.into();
                    active.status = Set(if wave_done {
                        WaveStatus::Completed.as_str().to_string()
                    } else {
                        WaveStatus::InProgress.as_str().to_string()
                    });
                    active.updated_by = Set(Some(operator));
                    active.update(txn).await?;

                    Ok((task, wave_done))
                })
            })
            .await?;

        if wave_done {
            let wave = self.load_wave(task.wave_id).await?;
            self.event_sender
                .send_or_log(Event::WaveCompleted {
                    wave_id: wave.id,
                    wave_no: wave.wave_no.clone(),
                })
                .await;
        }
        Ok(task)
    }

    /// Cancels one pending task; the wave still completes when the rest
    /// settle.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn cancel_task(
        &self,
        task_id: Uuid,
        operator: &str,
    ) -> Result<picking_task::Model, ServiceError> {
        let task = self.load_task(task_id).await?;
        if task.status() != Some(TaskStatus::Pending) {
            return Err(ServiceError::InvalidTransition(format!(
                "Picking task {} is not pending",
                task.id
            )));
        }
        let wave = self.load_wave(task.wave_id).await?;

        let operator = operator.to_string();
        let (task, wave_done) = self
            .db
            .transaction::<_, (picking_task::Model, bool), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut active: picking_task::ActiveModel = task.into();
                    active.status = Set(TaskStatus::Cancelled.as_str().to_string());
                    let task = active.update(txn).await?;

                    let open_tasks = PickingTaskEntity::find()
                        .filter(picking_task::Column::WaveId.eq(task.wave_id))
                        .filter(picking_task::Column::Status.eq(TaskStatus::Pending.as_str()))
                        .all(txn)
                        .await?;
                    let wave_done = open_tasks.is_empty();
                    if wave_done {
                        let mut active: picking_wave::ActiveModel = wave.into();
                        active.status = Set(WaveStatus::Completed.as_str().to_string());
                        active.updated_by = Set(Some(operator));
                        active.update(txn).await?;
                    }
                    Ok((task, wave_done))
                })
            })
            .await?;

        if wave_done {
            let wave = self.load_wave(task.wave_id).await?;
            self.event_sender
                .send_or_log(Event::WaveCompleted {
                    wave_id: wave.id,
                    wave_no: wave.wave_no.clone(),
                })
                .await;
        }
        Ok(task)
    }

    /// Cancels the whole wave: every pending task is cancelled and the
    /// member orders are detached so they can join a new wave. Cancelling
    /// an already-cancelled wave is a no-op.
    #[instrument(skip(self), fields(wave_id = %id))]
    pub async fn cancel_wave(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<picking_wave::Model, ServiceError> {
        let wave = self.load_wave(id).await?;
        match wave.status() {
            Some(WaveStatus::Cancelled) => return Ok(wave),
            Some(WaveStatus::Completed) => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Wave {} is completed and cannot be cancelled",
                    wave.wave_no
                )))
            }
            Some(_) => {}
            None => {
                return Err(ServiceError::InternalError(format!(
                    "Wave {} carries unknown status '{}'",
                    wave.wave_no, wave.status
                )))
            }
        }

        let operator = operator.to_string();
        let wave = self
            .db
            .transaction::<_, picking_wave::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let tasks = PickingTaskEntity::find()
                        .filter(picking_task::Column::WaveId.eq(wave.id))
                        .filter(picking_task::Column::Status.eq(TaskStatus::Pending.as_str()))
                        .all(txn)
                        .await?;
                    for task in tasks {
                        let mut active: picking_task::ActiveModel = task.into();
                        active.status = Set(TaskStatus::Cancelled.as_str().to_string());
                        active.update(txn).await?;
                    }

                    let members = OutboundOrderEntity::find()
                        .filter(outbound_order::Column::WaveId.eq(wave.id))
                        .all(txn)
                        .await?;
                    for order in members {
                        let mut active: outbound_order::ActiveModel = order.into();
                        active.wave_id = Set(None);
                        active.update(txn).await?;
                    }

                    let mut active: picking_wave::ActiveModel = wave.into();
                    active.status = Set(WaveStatus::Cancelled.as_str().to_string());
                    active.updated_by = Set(Some(operator));
                    let wave = active.update(txn).await?;
                    Ok(wave)
                })
            })
            .await?;

        info!(wave_no = %wave.wave_no, "picking wave cancelled");
        Ok(wave)
    }

    async fn load_wave(&self, id: Uuid) -> Result<picking_wave::Model, ServiceError> {
        PickingWaveEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Picking wave {} not found", id)))
    }

    async fn load_task(&self, id: Uuid) -> Result<picking_task::Model, ServiceError> {
        PickingTaskEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Picking task {} not found", id)))
    }
}
