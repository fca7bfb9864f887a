//! Stock taking (cycle count) workflow
//!
//! A plan defines the count scope and spawns one line per in-scope stock
//! record, with the book quantity snapshotted at generation time. Lines
//! run Pending -> Counted -> Reviewed -> Adjusted (or Excluded); only the
//! adjustment step touches stock, posting the signed count difference as
//! TAKING_ADJUST. The plan completes when every line is settled.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_log::OperationType;
use crate::entities::stock_taking_line::{self, Entity as TakingLineEntity, TakingLineStatus};
use crate::entities::stock_taking_plan::{self, Entity as TakingPlanEntity, TakingPlanStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::{StockPosting, StockStore};

pub const BUSINESS_TYPE_TAKING: &str = "stock_taking";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePlanCommand {
    #[validate(length(min = 1, max = 64))]
    pub plan_no: String,
    pub warehouse_id: Uuid,
    /// Narrow the count to one location when set.
    pub location_id: Option<Uuid>,
    /// Narrow the count to one goods when set.
    pub goods_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub remark: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub operator: String,
}

#[derive(Clone)]
pub struct StockTakingService {
    db: Arc<DatabaseConnection>,
    stock: StockStore,
    event_sender: EventSender,
}

impl StockTakingService {
    pub fn new(db: Arc<DatabaseConnection>, stock: StockStore, event_sender: EventSender) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    #[instrument(skip(self, cmd), fields(plan_no = %cmd.plan_no))]
    pub async fn create_plan(
        &self,
        cmd: CreatePlanCommand,
    ) -> Result<stock_taking_plan::Model, ServiceError> {
        cmd.validate()?;
        let plan = stock_taking_plan::ActiveModel {
            plan_no: Set(cmd.plan_no.clone()),
            warehouse_id: Set(cmd.warehouse_id),
            location_id: Set(cmd.location_id),
            goods_id: Set(cmd.goods_id),
            status: Set(TakingPlanStatus::Draft.as_str().to_string()),
            line_count: Set(0),
            completed_count: Set(0),
            diff_count: Set(0),
            remark: Set(cmd.remark.clone()),
            created_by: Set(cmd.operator.clone()),
            ..Default::default()
        };
        let plan = plan.insert(&*self.db).await?;
        info!(plan_no = %plan.plan_no, "stock taking plan created");
        Ok(plan)
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<stock_taking_plan::Model, ServiceError> {
        self.load_plan(id).await
    }

    pub async fn lines(&self, plan_id: Uuid) -> Result<Vec<stock_taking_line::Model>, ServiceError> {
        let lines = TakingLineEntity::find()
            .filter(stock_taking_line::Column::PlanId.eq(plan_id))
            .all(&*self.db)
            .await?;
        Ok(lines)
    }

    /// Draft -> Counting. Spawns one line per in-scope stock record with
    /// its quantity as the book value. A scope matching nothing yields an
    /// empty plan that can be completed immediately.
    #[instrument(skip(self), fields(plan_id = %id))]
    pub async fn generate_lines(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_plan::Model, ServiceError> {
        let plan = self.load_plan(id).await?;
        let status = parse_plan_status(&plan)?;
        if !status.can_transition(TakingPlanStatus::Counting) {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} cannot generate lines from status {}",
                plan.plan_no,
                status.as_str()
            )));
        }

        let records = self
            .stock
            .find_by_scope(plan.warehouse_id, plan.location_id, plan.goods_id)
            .await?;

        let operator = operator.to_string();
        let plan = self
            .db
            .transaction::<_, stock_taking_plan::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let line_count = records.len() as i32;
                    for record in &records {
                        let line = stock_taking_line::ActiveModel {
                            plan_id: Set(plan.id),
                            warehouse_id: Set(record.warehouse_id),
                            goods_id: Set(record.goods_id),
                            location_id: Set(record.location_id),
                            batch_no: Set(record.batch_no.clone()),
                            book_quantity: Set(record.quantity),
                            actual_quantity: Set(None),
                            status: Set(TakingLineStatus::Pending.as_str().to_string()),
                            ..Default::default()
                        };
                        line.insert(txn).await?;
                    }

                    let mut active: stock_taking_plan::ActiveModel = plan.into();
                    active.status = Set(TakingPlanStatus::Counting.as_str().to_string());
                    active.line_count = Set(line_count);
                    active.updated_by = Set(Some(operator));
                    let plan = active.update(txn).await?;
                    Ok(plan)
                })
            })
            .await?;

        info!(plan_no = %plan.plan_no, lines = plan.line_count, "stock taking lines generated");
        Ok(plan)
    }

    /// Records a counted quantity. Recounting before review overwrites the
    /// previous count.
    #[instrument(skip(self), fields(line_id = %line_id, actual = actual_quantity))]
    pub async fn count(
        &self,
        line_id: Uuid,
        actual_quantity: i32,
        operator: &str,
    ) -> Result<stock_taking_line::Model, ServiceError> {
        if actual_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Counted quantity must not be negative".to_string(),
            ));
        }
        let line = self.load_line(line_id).await?;
        self.ensure_plan_counting(line.plan_id).await?;
        let status = parse_line_status(&line)?;
        if !status.can_transition(TakingLineStatus::Counted) {
            return Err(invalid_line_transition(&line, status, TakingLineStatus::Counted));
        }

        let mut active: stock_taking_line::ActiveModel = line.into();
        active.actual_quantity = Set(Some(actual_quantity));
        active.status = Set(TakingLineStatus::Counted.as_str().to_string());
        active.counted_by = Set(Some(operator.to_string()));
        let line = active.update(&*self.db).await?;
        Ok(line)
    }

    /// Counted -> Reviewed.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn review(
        &self,
        line_id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_line::Model, ServiceError> {
        let line = self.load_line(line_id).await?;
        self.ensure_plan_counting(line.plan_id).await?;
        let status = parse_line_status(&line)?;
        if !status.can_transition(TakingLineStatus::Reviewed) {
            return Err(invalid_line_transition(
                &line,
                status,
                TakingLineStatus::Reviewed,
            ));
        }

        let mut active: stock_taking_line::ActiveModel = line.into();
        active.status = Set(TakingLineStatus::Reviewed.as_str().to_string());
        active.reviewed_by = Set(Some(operator.to_string()));
        let line = active.update(&*self.db).await?;
        Ok(line)
    }

    /// Reviewed -> Adjusted. Posts the signed count difference; a zero
    /// difference settles the line without touching stock.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn adjust(
        &self,
        line_id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_line::Model, ServiceError> {
        let line = self.load_line(line_id).await?;
        let plan = self.load_plan(line.plan_id).await?;
        if parse_plan_status(&plan)? != TakingPlanStatus::Counting {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} is not counting",
                plan.plan_no
            )));
        }
        let status = parse_line_status(&line)?;
        if !status.can_transition(TakingLineStatus::Adjusted) {
            return Err(invalid_line_transition(
                &line,
                status,
                TakingLineStatus::Adjusted,
            ));
        }
        let difference = line.difference().ok_or_else(|| {
            ServiceError::InternalError(format!("Stock taking line {} reviewed without a count", line.id))
        })?;

        if difference != 0 {
            // Idempotent: a crash after this posting but before the status
            // write below re-runs as a ledger-deduplicated no-op.
            self.stock
                .adjust(StockPosting {
                    key: line.stock_key(),
                    quantity: difference,
                    operation_type: OperationType::TakingAdjust,
                    business_type: BUSINESS_TYPE_TAKING.to_string(),
                    business_no: plan.plan_no.clone(),
                    business_line: line.id.to_string(),
                    operator: operator.to_string(),
                    expire_date: None,
                })
                .await?;
        }

        let line = self
            .settle_line(line, plan, TakingLineStatus::Adjusted, operator, difference != 0)
            .await?;

        self.event_sender
            .send_or_log(Event::StockTakingLineAdjusted {
                plan_id: line.plan_id,
                line_id: line.id,
                difference,
            })
            .await;
        Ok(line)
    }

    /// Excludes a line from the count; it settles without adjustment.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn exclude(
        &self,
        line_id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_line::Model, ServiceError> {
        let line = self.load_line(line_id).await?;
        let plan = self.load_plan(line.plan_id).await?;
        if parse_plan_status(&plan)? != TakingPlanStatus::Counting {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} is not counting",
                plan.plan_no
            )));
        }
        let status = parse_line_status(&line)?;
        if !status.can_transition(TakingLineStatus::Excluded) {
            return Err(invalid_line_transition(
                &line,
                status,
                TakingLineStatus::Excluded,
            ));
        }
        self.settle_line(line, plan, TakingLineStatus::Excluded, operator, false)
            .await
    }

    /// Counting -> Completed once every line is settled.
    #[instrument(skip(self), fields(plan_id = %id))]
    pub async fn complete_plan(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_plan::Model, ServiceError> {
        let plan = self.load_plan(id).await?;
        let status = parse_plan_status(&plan)?;
        if !status.can_transition(TakingPlanStatus::Completed) {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} cannot complete from status {}",
                plan.plan_no,
                status.as_str()
            )));
        }

        let lines = self.lines(plan.id).await?;
        let unsettled = lines
            .iter()
            .filter(|line| {
                line.status()
                    .map(|s| !s.is_settled())
                    .unwrap_or(true)
            })
            .count();
        if unsettled > 0 {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} still has {} unsettled lines",
                plan.plan_no, unsettled
            )));
        }

        let plan_no = plan.plan_no.clone();
        let diff_count = plan.diff_count;
        let mut active: stock_taking_plan::ActiveModel = plan.into();
        active.status = Set(TakingPlanStatus::Completed.as_str().to_string());
        active.updated_by = Set(Some(operator.to_string()));
        let plan = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::StockTakingPlanCompleted {
                plan_id: plan.id,
                plan_no,
                diff_count,
            })
            .await;
        Ok(plan)
    }

    /// Cancels an open plan; lines keep their state, nothing posts.
    /// Cancelling an already-cancelled plan is a no-op.
    #[instrument(skip(self), fields(plan_id = %id))]
    pub async fn cancel_plan(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<stock_taking_plan::Model, ServiceError> {
        let plan = self.load_plan(id).await?;
        let status = parse_plan_status(&plan)?;
        if status == TakingPlanStatus::Cancelled {
            return Ok(plan);
        }
        if !status.can_transition(TakingPlanStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} cannot cancel from status {}",
                plan.plan_no,
                status.as_str()
            )));
        }
        let mut active: stock_taking_plan::ActiveModel = plan.into();
        active.status = Set(TakingPlanStatus::Cancelled.as_str().to_string());
        active.updated_by = Set(Some(operator.to_string()));
        let plan = active.update(&*self.db).await?;
        Ok(plan)
    }

    /// Settles a line and folds it into the plan's counters in one
    /// transaction.
    async fn settle_line(
        &self,
        line: stock_taking_line::Model,
        plan: stock_taking_plan::Model,
        to: TakingLineStatus,
        operator: &str,
        counts_as_diff: bool,
    ) -> Result<stock_taking_line::Model, ServiceError> {
        let operator = operator.to_string();
        let plan_id = plan.id;
        let line = self
            .db
            .transaction::<_, stock_taking_line::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let reviewed_by = line.reviewed_by.clone();
                    let mut active: stock_taking_line::ActiveModel = line.into();
                    active.status = Set(to.as_str().to_string());
                    if to == TakingLineStatus::Adjusted {
                        active.reviewed_by = Set(reviewed_by.or(Some(operator.clone())));
                    }
                    let line = active.update(txn).await?;

                    // Counters fold from the plan row as it is inside this
                    // transaction, not from the snapshot read earlier.
                    let plan = TakingPlanEntity::find_by_id(plan_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Stock taking plan {} not found",
                                plan_id
                            ))
                        })?;
                    let completed = plan.completed_count + 1;
                    let diffs = plan.diff_count + if counts_as_diff { 1 } else { 0 };
                    let mut active: stock_taking_plan::ActiveModel = plan.into();
                    active.completed_count = Set(completed);
                    active.diff_count = Set(diffs);
                    active.updated_by = Set(Some(operator));
                    active.update(txn).await?;

                    Ok(line)
                })
            })
            .await?;
        Ok(line)
    }

    async fn ensure_plan_counting(&self, plan_id: Uuid) -> Result<(), ServiceError> {
        let plan = self.load_plan(plan_id).await?;
        if parse_plan_status(&plan)? != TakingPlanStatus::Counting {
            return Err(ServiceError::InvalidTransition(format!(
                "Stock taking plan {} is not counting",
                plan.plan_no
            )));
        }
        Ok(())
    }

    async fn load_plan(&self, id: Uuid) -> Result<stock_taking_plan::Model, ServiceError> {
        TakingPlanEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock taking plan {} not found", id)))
    }

    async fn load_line(&self, id: Uuid) -> Result<stock_taking_line::Model, ServiceError> {
        TakingLineEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock taking line {} not found", id)))
    }
}

fn parse_plan_status(
    plan: &stock_taking_plan::Model,
) -> Result<TakingPlanStatus, ServiceError> {
    plan.status().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Stock taking plan {} carries unknown status '{}'",
            plan.plan_no, plan.status
        ))
    })
}

fn parse_line_status(
    line: &stock_taking_line::Model,
) -> Result<TakingLineStatus, ServiceError> {
    line.status().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "Stock taking line {} carries unknown status '{}'",
            line.id, line.status
        ))
    })
}

fn invalid_line_transition(
    line: &stock_taking_line::Model,
    from: TakingLineStatus,
    to: TakingLineStatus,
) -> ServiceError {
    ServiceError::InvalidTransition(format!(
        "Stock taking line {} cannot go from {} to {}",
        line.id,
        from.as_str(),
        to.as_str()
    ))
}
