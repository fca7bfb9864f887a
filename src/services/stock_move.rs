//! Stock move workflow
//!
//! Pending -> Executing -> Completed, Cancelled only from Pending. The
//! MOVE_OUT and MOVE_IN legs post in one transaction: if the inbound leg
//! fails, the outbound leg rolls back with it and the source location is
//! untouched. `Executing` is written before posting so an interrupted move
//! is visible and `execute` can be retried; the legs themselves are
//! idempotent postings.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_log::OperationType;
use crate::entities::stock_move::{self, Entity as StockMoveEntity, MoveStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::{StockPosting, StockStore};

pub const BUSINESS_TYPE_MOVE: &str = "stock_move";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMoveCommand {
    #[validate(length(min = 1, max = 64))]
    pub move_no: String,
    pub warehouse_id: Uuid,
    pub goods_id: Uuid,
    #[validate(length(max = 64))]
    pub batch_no: String,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub remark: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub operator: String,
}

#[derive(Clone)]
pub struct StockMoveService {
    db: Arc<DatabaseConnection>,
    stock: StockStore,
    event_sender: EventSender,
}

impl StockMoveService {
    pub fn new(db: Arc<DatabaseConnection>, stock: StockStore, event_sender: EventSender) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    #[instrument(skip(self, cmd), fields(move_no = %cmd.move_no))]
    pub async fn create(&self, cmd: CreateMoveCommand) -> Result<stock_move::Model, ServiceError> {
        cmd.validate()?;
        if cmd.from_location_id == cmd.to_location_id {
            return Err(ServiceError::ValidationError(
                "Cannot move stock to its own location".to_string(),
            ));
        }

        let record = stock_move::ActiveModel {
            move_no: Set(cmd.move_no.clone()),
            warehouse_id: Set(cmd.warehouse_id),
            goods_id: Set(cmd.goods_id),
            batch_no: Set(cmd.batch_no.clone()),
            from_location_id: Set(cmd.from_location_id),
            to_location_id: Set(cmd.to_location_id),
            quantity: Set(cmd.quantity),
            status: Set(MoveStatus::Pending.as_str().to_string()),
            remark: Set(cmd.remark.clone()),
            created_by: Set(cmd.operator.clone()),
            ..Default::default()
        };
        let record = record.insert(&*self.db).await?;
        info!(move_no = %record.move_no, "stock move created");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<stock_move::Model, ServiceError> {
        self.load(id).await
    }

    pub async fn list_pending(&self) -> Result<Vec<stock_move::Model>, ServiceError> {
        let moves = StockMoveEntity::find()
            .filter(stock_move::Column::Status.eq(MoveStatus::Pending.as_str()))
            .all(&*self.db)
            .await?;
        Ok(moves)
    }

    /// Posts both legs and completes the move. Retryable: a move left in
    /// `Executing` by a crash re-posts its legs, which the ledger
    /// deduplicates, and then completes.
    #[instrument(skip(self), fields(move_id = %id))]
    pub async fn execute(&self, id: Uuid, operator: &str) -> Result<stock_move::Model, ServiceError> {
        let mv = self.load(id).await?;
        let status = parse_status(&mv)?;
        let mv = match status {
            MoveStatus::Pending => {
                self.update_status(mv, MoveStatus::Executing, operator).await?
            }
            // Retry of an interrupted execution.
            MoveStatus::Executing => mv,
            other => {
                return Err(ServiceError::InvalidTransition(format!(
                    "Stock move {} cannot execute from status {}",
                    mv.move_no,
                    other.as_str()
                )))
            }
        };

        let postings = vec![
            StockPosting {
                key: mv.from_key(),
                quantity: -mv.quantity,
                operation_type: OperationType::MoveOut,
                business_type: BUSINESS_TYPE_MOVE.to_string(),
                business_no: mv.move_no.clone(),
                business_line: mv.id.to_string(),
                operator: operator.to_string(),
                expire_date: None,
            },
            StockPosting {
                key: mv.to_key(),
                quantity: mv.quantity,
                operation_type: OperationType::MoveIn,
                business_type: BUSINESS_TYPE_MOVE.to_string(),
                business_no: mv.move_no.clone(),
                business_line: mv.id.to_string(),
                operator: operator.to_string(),
                expire_date: None,
            },
        ];
        self.stock.adjust_batch(postings).await?;

        let mv = self.update_status(mv, MoveStatus::Completed, operator).await?;
        self.event_sender
            .send_or_log(Event::StockMoveCompleted {
                move_id: mv.id,
                move_no: mv.move_no.clone(),
            })
            .await;
        Ok(mv)
    }

    /// Cancels a move that has not started executing. Cancelling an
    /// already-cancelled move is a no-op.
    #[instrument(skip(self), fields(move_id = %id))]
    pub async fn cancel(&self, id: Uuid, operator: &str) -> Result<stock_move::Model, ServiceError> {
        let mv = self.load(id).await?;
        let status = parse_status(&mv)?;
        if status == MoveStatus::Cancelled {
            return Ok(mv);
        }
        if !status.can_transition(MoveStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock move {} cannot cancel from status {}",
                mv.move_no,
                status.as_str()
            )));
        }
        self.update_status(mv, MoveStatus::Cancelled, operator).await
    }

    async fn load(&self, id: Uuid) -> Result<stock_move::Model, ServiceError> {
        StockMoveEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock move {} not found", id)))
    }

    async fn update_status(
        &self,
        mv: stock_move::Model,
        to: MoveStatus,
        operator: &str,
    ) -> Result<stock_move::Model, ServiceError> {
        let mut active: stock_move::ActiveModel = mv.into();
        active.status = Set(to.as_str().to_string());
        active.updated_by = Set(Some(operator.to_string()));
        let mv = active.update(&*self.db).await?;
        info!(move_no = %mv.move_no, status = to.as_str(), "stock move status updated");
        Ok(mv)
    }
}

fn parse_status(mv: &stock_move::Model) -> Result<MoveStatus, ServiceError> {
    mv.status().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Stock move {} carries unknown status '{}'",
            mv.move_no, mv.status
        ))
    })
}
