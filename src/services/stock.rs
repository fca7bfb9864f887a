//! Stock Record Store
//!
//! The single authority over `stock_records` and the only writer of
//! `inventory_log`. Every mutation here is linearizable per stock key and
//! appends its ledger entry in the same transaction as the record update,
//! so the two can never diverge.

use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inventory_log::{self, Entity as InventoryLogEntity, OperationType};
use crate::entities::stock_record::{self, Entity as StockRecordEntity, StockKey};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

lazy_static! {
    static ref STOCK_POSTINGS: IntCounterVec = IntCounterVec::new(
        Opts::new("stock_postings_total", "Total number of accepted ledger postings"),
        &["operation_type"]
    )
    .expect("metric can be created");
    static ref STOCK_POSTING_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stock_posting_failures_total",
            "Total number of rejected stock mutations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    static ref STOCK_DUPLICATE_POSTINGS: IntCounter = IntCounter::new(
        "stock_duplicate_postings_total",
        "Postings skipped because the ledger already holds them"
    )
    .expect("metric can be created");
}

/// One requested ledger posting (adjust or consume).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPosting {
    pub key: StockKey,
    /// Signed delta for adjusts; positive consumed amount for consumes.
    pub quantity: i32,
    pub operation_type: OperationType,
    pub business_type: String,
    pub business_no: String,
    /// Line discriminator within the order; part of the idempotency key.
    pub business_line: String,
    pub operator: String,
    /// Stamped onto the stock record on first receipt of a batch.
    pub expire_date: Option<chrono::NaiveDate>,
}

/// One stock-side effect of a workflow transition.
///
/// Workflow services build a list of these and apply them through
/// [`StockStore::apply_in_txn`] inside their own transaction, or use the
/// store's contract methods which wrap a single list in a fresh transaction.
#[derive(Debug, Clone)]
pub enum StockOp {
    Adjust(StockPosting),
    Consume(StockPosting),
    Reserve { key: StockKey, amount: i32 },
    Release { key: StockKey, amount: i32 },
}

impl StockOp {
    pub fn key(&self) -> &StockKey {
        match self {
            StockOp::Adjust(p) | StockOp::Consume(p) => &p.key,
            StockOp::Reserve { key, .. } | StockOp::Release { key, .. } => key,
        }
    }
}

/// Outcome of one applied op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingResult {
    pub key: StockKey,
    pub quantity_before: i32,
    pub quantity_change: i32,
    pub quantity_after: i32,
    /// True when the ledger already held this posting; nothing was mutated
    /// and the numbers mirror the original entry.
    pub duplicate: bool,
    /// Ledger entry id; `None` for reserve/release, which do not post.
    pub log_id: Option<Uuid>,
}

/// Per-key async mutex registry. Guards are acquired in sorted key order so
/// two multi-key operations can never deadlock against each other.
#[derive(Clone, Default)]
struct KeyLocks {
    locks: Arc<DashMap<StockKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: &StockKey) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    async fn acquire_many(&self, keys: &[StockKey]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<StockKey> = keys.to_vec();
        sorted.sort();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for key in &sorted {
            guards.push(self.acquire(key).await);
        }
        guards
    }
}

/// Service owning all stock record mutation.
#[derive(Clone)]
pub struct StockStore {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    locks: KeyLocks,
}

impl StockStore {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db,
            event_sender,
            locks: KeyLocks::default(),
        }
    }

    /// Acquires the per-key guards for every key touched by `ops`, in
    /// sorted order. Workflow services hold the returned guards across
    /// their own transaction when they apply ops via [`apply_in_txn`].
    ///
    /// [`apply_in_txn`]: StockStore::apply_in_txn
    pub async fn lock_ops(&self, ops: &[StockOp]) -> Vec<OwnedMutexGuard<()>> {
        let keys: Vec<StockKey> = ops.iter().map(|op| op.key().clone()).collect();
        self.locks.acquire_many(&keys).await
    }

    /// Applies one op inside the caller's transaction.
    ///
    /// The caller must hold the key guards (see [`StockStore::lock_ops`])
    /// for the whole transaction. Any error aborts the caller's
    /// transaction, rolling back every previously applied op with it.
    pub async fn apply_in_txn(
        txn: &DatabaseTransaction,
        op: &StockOp,
    ) -> Result<PostingResult, ServiceError> {
        match op {
            StockOp::Adjust(posting) => Self::apply_adjust(txn, posting).await,
            StockOp::Consume(posting) => Self::apply_consume(txn, posting).await,
            StockOp::Reserve { key, amount } => Self::apply_reserve(txn, key, *amount).await,
            StockOp::Release { key, amount } => Self::apply_release(txn, key, *amount).await,
        }
    }

    /// Adjusts one key by a signed delta, creating the record on first
    /// receipt. Atomic with the ledger append.
    #[instrument(skip(self, posting), fields(key = %posting.key, delta = posting.quantity))]
    pub async fn adjust(&self, posting: StockPosting) -> Result<PostingResult, ServiceError> {
        let results = self.execute(vec![StockOp::Adjust(posting)]).await?;
        single_result(results)
    }

    /// Applies several adjusts as one all-or-nothing transaction. Used by
    /// inbound completion (one leg per item) and stock moves (the
    /// MOVE_OUT/MOVE_IN pair).
    pub async fn adjust_batch(
        &self,
        postings: Vec<StockPosting>,
    ) -> Result<Vec<PostingResult>, ServiceError> {
        self.execute(postings.into_iter().map(StockOp::Adjust).collect())
            .await
    }

    /// Raises the key's hold. No ledger entry is written.
    #[instrument(skip(self), fields(key = %key, amount))]
    pub async fn reserve(&self, key: StockKey, amount: i32) -> Result<PostingResult, ServiceError> {
        let results = self.execute(vec![StockOp::Reserve { key, amount }]).await?;
        single_result(results)
    }

    /// Lowers the key's hold. Over-release is an error; workflow callers
    /// get idempotency by releasing only the hold recorded on their own
    /// lines, inside the transaction that zeroes those lines.
    #[instrument(skip(self), fields(key = %key, amount))]
    pub async fn release(&self, key: StockKey, amount: i32) -> Result<PostingResult, ServiceError> {
        let results = self.execute(vec![StockOp::Release { key, amount }]).await?;
        single_result(results)
    }

    /// Consumes a fulfilled reservation: quantity and hold drop together,
    /// with an atomic ledger append.
    #[instrument(skip(self, posting), fields(key = %posting.key, amount = posting.quantity))]
    pub async fn consume(&self, posting: StockPosting) -> Result<PostingResult, ServiceError> {
        let results = self.execute(vec![StockOp::Consume(posting)]).await?;
        single_result(results)
    }

    /// Applies a mixed list of ops as one all-or-nothing transaction with
    /// all key guards held. Results come back in op order.
    pub async fn execute(&self, ops: Vec<StockOp>) -> Result<Vec<PostingResult>, ServiceError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let _guards = self.lock_ops(&ops).await;

        let ops_for_txn = ops.clone();
        let results = self
            .db
            .transaction::<_, Vec<PostingResult>, ServiceError>(|txn| {
                Box::pin(async move {
                    let mut results = Vec::with_capacity(ops_for_txn.len());
                    for op in &ops_for_txn {
                        results.push(Self::apply_in_txn(txn, op).await?);
                    }
                    Ok(results)
                })
            })
            .await
            .map_err(|e| {
                let err = ServiceError::from(e);
                STOCK_POSTING_FAILURES
                    .with_label_values(&[err.code()])
                    .inc();
                err
            })?;

        self.publish_op_events(&ops, &results).await;
        Ok(results)
    }

    /// Emits stock events for committed ops. Callers that ran
    /// [`apply_in_txn`] inside their own transaction invoke this after
    /// commit; the store's own contract methods call it internally.
    pub async fn publish_op_events(&self, ops: &[StockOp], results: &[PostingResult]) {
        for (op, result) in ops.iter().zip(results) {
            match op {
                StockOp::Adjust(p) | StockOp::Consume(p) => {
                    STOCK_POSTINGS
                        .with_label_values(&[p.operation_type.as_str()])
                        .inc();
                    if result.duplicate {
                        STOCK_DUPLICATE_POSTINGS.inc();
                        continue;
                    }
                    self.event_sender
                        .send_or_log(Event::StockPosted {
                            key: result.key.clone(),
                            operation_type: p.operation_type,
                            business_no: p.business_no.clone(),
                            quantity_before: result.quantity_before,
                            quantity_change: result.quantity_change,
                            quantity_after: result.quantity_after,
                        })
                        .await;
                }
                StockOp::Reserve { key, amount } => {
                    self.event_sender
                        .send_or_log(Event::StockReserved {
                            key: key.clone(),
                            amount: *amount,
                            business_no: String::new(),
                        })
                        .await;
                }
                StockOp::Release { key, amount } => {
                    self.event_sender
                        .send_or_log(Event::StockReleased {
                            key: key.clone(),
                            amount: *amount,
                            business_no: String::new(),
                        })
                        .await;
                }
            }
        }
    }

    /// Current record for a key.
    pub async fn get(&self, key: &StockKey) -> Result<Option<stock_record::Model>, ServiceError> {
        Self::find_record(&*self.db, key).await
    }

    /// Current available quantity; zero for a never-seen key.
    pub async fn available(&self, key: &StockKey) -> Result<i32, ServiceError> {
        Ok(self.get(key).await?.map(|r| r.available()).unwrap_or(0))
    }

    /// One page of all stock records, oldest first. Used by the snapshot
    /// engine to walk the whole store without loading it at once.
    pub async fn list_page(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_record::Model>, u64), ServiceError> {
        let paginator = StockRecordEntity::find()
            .order_by_asc(stock_record::Column::CreatedAt)
            .order_by_asc(stock_record::Column::Id)
            .paginate(&*self.db, per_page);
        let pages = paginator.num_pages().await?;
        let records = paginator.fetch_page(page).await?;
        Ok((records, pages))
    }

    /// All records within a count scope, warehouse-wide unless narrowed.
    pub async fn find_by_scope(
        &self,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        goods_id: Option<Uuid>,
    ) -> Result<Vec<stock_record::Model>, ServiceError> {
        let mut query = StockRecordEntity::find()
            .filter(stock_record::Column::WarehouseId.eq(warehouse_id));
        if let Some(location_id) = location_id {
            query = query.filter(stock_record::Column::LocationId.eq(location_id));
        }
        if let Some(goods_id) = goods_id {
            query = query.filter(stock_record::Column::GoodsId.eq(goods_id));
        }
        let records = query
            .order_by_asc(stock_record::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(records)
    }

    // ---- op application, shared by both transaction styles ----

    async fn apply_adjust(
        txn: &DatabaseTransaction,
        posting: &StockPosting,
    ) -> Result<PostingResult, ServiceError> {
        validate_posting(posting)?;
        if posting.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity must not be zero".to_string(),
            ));
        }
        if let Some(existing) = Self::find_posted(txn, posting).await? {
            return Ok(duplicate_result(&existing));
        }

        let record = Self::find_record(txn, &posting.key).await?;
        let (before, lock_quantity) = match &record {
            Some(r) => (r.quantity, r.lock_quantity),
            None => (0, 0),
        };
        let after = before + posting.quantity;
        if after < 0 {
            STOCK_POSTING_FAILURES
                .with_label_values(&["insufficient_stock"])
                .inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Adjust of {} on {} would leave quantity {} below zero",
                posting.quantity, posting.key, after
            )));
        }
        if after < lock_quantity {
            STOCK_POSTING_FAILURES
                .with_label_values(&["insufficient_stock"])
                .inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Adjust of {} on {} would leave quantity {} below hold {}",
                posting.quantity, posting.key, after, lock_quantity
            )));
        }

        match record {
            Some(r) => {
                let expire_date = r.expire_date.or(posting.expire_date);
                let version = r.version;
                let mut active: stock_record::ActiveModel = r.into();
                active.quantity = Set(after);
                active.expire_date = Set(expire_date);
                active.version = Set(version + 1);
                active.updated_by = Set(Some(posting.operator.clone()));
                active.update(txn).await?;
            }
            None => {
                let active = stock_record::ActiveModel {
                    warehouse_id: Set(posting.key.warehouse_id),
                    goods_id: Set(posting.key.goods_id),
                    location_id: Set(posting.key.location_id),
                    batch_no: Set(posting.key.batch_no.clone()),
                    quantity: Set(after),
                    lock_quantity: Set(0),
                    expire_date: Set(posting.expire_date),
                    version: Set(1),
                    updated_by: Set(Some(posting.operator.clone())),
                    ..Default::default()
                };
                active.insert(txn).await?;
            }
        }

        let entry = Self::append_log(txn, posting, before, posting.quantity).await?;
        Ok(PostingResult {
            key: posting.key.clone(),
            quantity_before: before,
            quantity_change: posting.quantity,
            quantity_after: after,
            duplicate: false,
            log_id: Some(entry.id),
        })
    }

    async fn apply_consume(
        txn: &DatabaseTransaction,
        posting: &StockPosting,
    ) -> Result<PostingResult, ServiceError> {
        validate_posting(posting)?;
        if posting.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Consumed quantity must be positive".to_string(),
            ));
        }
        if let Some(existing) = Self::find_posted(txn, posting).await? {
            return Ok(duplicate_result(&existing));
        }

        let record = Self::find_record(txn, &posting.key).await?.ok_or_else(|| {
            ServiceError::InsufficientStock(format!("No stock record for {}", posting.key))
        })?;
        if posting.quantity > record.lock_quantity {
            STOCK_POSTING_FAILURES
                .with_label_values(&["insufficient_stock"])
                .inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Consume of {} on {} exceeds hold {}",
                posting.quantity, posting.key, record.lock_quantity
            )));
        }

        let before = record.quantity;
        let after = before - posting.quantity;
        let new_lock = record.lock_quantity - posting.quantity;
        let version = record.version;
        let mut active: stock_record::ActiveModel = record.into();
        active.quantity = Set(after);
        active.lock_quantity = Set(new_lock);
        active.version = Set(version + 1);
        active.updated_by = Set(Some(posting.operator.clone()));
        active.update(txn).await?;

        let entry = Self::append_log(txn, posting, before, -posting.quantity).await?;
        Ok(PostingResult {
            key: posting.key.clone(),
            quantity_before: before,
            quantity_change: -posting.quantity,
            quantity_after: after,
            duplicate: false,
            log_id: Some(entry.id),
        })
    }

    async fn apply_reserve(
        txn: &DatabaseTransaction,
        key: &StockKey,
        amount: i32,
    ) -> Result<PostingResult, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Reserved quantity must be positive".to_string(),
            ));
        }
        let record = Self::find_record(txn, key).await?.ok_or_else(|| {
            ServiceError::InsufficientStock(format!("No stock record for {}", key))
        })?;
        if amount > record.available() {
            STOCK_POSTING_FAILURES
                .with_label_values(&["insufficient_stock"])
                .inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Reserve of {} on {} exceeds available {}",
                amount,
                key,
                record.available()
            )));
        }

        let quantity = record.quantity;
        let new_lock = record.lock_quantity + amount;
        let version = record.version;
        let mut active: stock_record::ActiveModel = record.into();
        active.lock_quantity = Set(new_lock);
        active.version = Set(version + 1);
        active.update(txn).await?;

        Ok(PostingResult {
            key: key.clone(),
            quantity_before: quantity,
            quantity_change: 0,
            quantity_after: quantity,
            duplicate: false,
            log_id: None,
        })
    }

    async fn apply_release(
        txn: &DatabaseTransaction,
        key: &StockKey,
        amount: i32,
    ) -> Result<PostingResult, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Released quantity must be positive".to_string(),
            ));
        }
        let record = Self::find_record(txn, key).await?.ok_or_else(|| {
            ServiceError::InsufficientStock(format!("No stock record for {}", key))
        })?;
        if amount > record.lock_quantity {
            STOCK_POSTING_FAILURES
                .with_label_values(&["insufficient_stock"])
                .inc();
            return Err(ServiceError::InsufficientStock(format!(
                "Release of {} on {} exceeds hold {}",
                amount, key, record.lock_quantity
            )));
        }

        let quantity = record.quantity;
        let new_lock = record.lock_quantity - amount;
        let version = record.version;
        let mut active: stock_record::ActiveModel = record.into();
        active.lock_quantity = Set(new_lock);
        active.version = Set(version + 1);
        active.update(txn).await?;

        Ok(PostingResult {
            key: key.clone(),
            quantity_before: quantity,
            quantity_change: 0,
            quantity_after: quantity,
            duplicate: false,
            log_id: None,
        })
    }

    async fn find_record<C: sea_orm::ConnectionTrait>(
        conn: &C,
        key: &StockKey,
    ) -> Result<Option<stock_record::Model>, ServiceError> {
        let record = StockRecordEntity::find()
            .filter(stock_record::Column::WarehouseId.eq(key.warehouse_id))
            .filter(stock_record::Column::GoodsId.eq(key.goods_id))
            .filter(stock_record::Column::LocationId.eq(key.location_id))
            .filter(stock_record::Column::BatchNo.eq(key.batch_no.clone()))
            .one(conn)
            .await?;
        Ok(record)
    }

    /// Idempotency probe: the ledger entry this posting would duplicate.
    async fn find_posted(
        txn: &DatabaseTransaction,
        posting: &StockPosting,
    ) -> Result<Option<inventory_log::Model>, ServiceError> {
        let existing = InventoryLogEntity::find()
            .filter(inventory_log::Column::OperationType.eq(posting.operation_type.as_str()))
            .filter(inventory_log::Column::BusinessNo.eq(posting.business_no.clone()))
            .filter(inventory_log::Column::BusinessLine.eq(posting.business_line.clone()))
            .filter(inventory_log::Column::WarehouseId.eq(posting.key.warehouse_id))
            .filter(inventory_log::Column::GoodsId.eq(posting.key.goods_id))
            .filter(inventory_log::Column::LocationId.eq(posting.key.location_id))
            .filter(inventory_log::Column::BatchNo.eq(posting.key.batch_no.clone()))
            .one(txn)
            .await?;
        if existing.is_some() {
            info!(
                business_no = %posting.business_no,
                business_line = %posting.business_line,
                operation_type = posting.operation_type.as_str(),
                "posting already in ledger; treating as applied"
            );
        }
        Ok(existing)
    }

    async fn append_log(
        txn: &DatabaseTransaction,
        posting: &StockPosting,
        quantity_before: i32,
        quantity_change: i32,
    ) -> Result<inventory_log::Model, ServiceError> {
        let entry = inventory_log::ActiveModel {
            warehouse_id: Set(posting.key.warehouse_id),
            goods_id: Set(posting.key.goods_id),
            location_id: Set(posting.key.location_id),
            batch_no: Set(posting.key.batch_no.clone()),
            operation_type: Set(posting.operation_type.as_str().to_string()),
            business_type: Set(posting.business_type.clone()),
            business_no: Set(posting.business_no.clone()),
            business_line: Set(posting.business_line.clone()),
            quantity_before: Set(quantity_before),
            quantity_change: Set(quantity_change),
            quantity_after: Set(quantity_before + quantity_change),
            operator: Set(posting.operator.clone()),
            ..Default::default()
        };
        let entry = entry.insert(txn).await?;
        Ok(entry)
    }
}

fn single_result(mut results: Vec<PostingResult>) -> Result<PostingResult, ServiceError> {
    results
        .pop()
        .ok_or_else(|| ServiceError::InternalError("posting produced no result".to_string()))
}

fn validate_posting(posting: &StockPosting) -> Result<(), ServiceError> {
    if posting.business_no.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "business_no must not be empty".to_string(),
        ));
    }
    if posting.operator.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "operator must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn duplicate_result(entry: &inventory_log::Model) -> PostingResult {
    PostingResult {
        key: entry.key(),
        quantity_before: entry.quantity_before,
        quantity_change: entry.quantity_change,
        quantity_after: entry.quantity_after,
        duplicate: true,
        log_id: Some(entry.id),
    }
}
