use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::inventory_log::OperationType;
use crate::entities::stock_record::StockKey;

/// Wrapper around the event channel's sending half.
///
/// Publication is best-effort and always happens after the owning
/// transaction commits; a full or closed channel never rolls anything back.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the receiver is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Domain events emitted by the ledger and the workflow state machines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// One accepted ledger posting (adjust or consume).
    StockPosted {
        key: StockKey,
        operation_type: OperationType,
        business_no: String,
        quantity_before: i32,
        quantity_change: i32,
        quantity_after: i32,
    },
    StockReserved {
        key: StockKey,
        amount: i32,
        business_no: String,
    },
    StockReleased {
        key: StockKey,
        amount: i32,
        business_no: String,
    },

    // Workflow lifecycle events
    InboundStatusChanged {
        inbound_id: Uuid,
        inbound_no: String,
        old_status: String,
        new_status: String,
    },
    OutboundStatusChanged {
        outbound_id: Uuid,
        outbound_no: String,
        old_status: String,
        new_status: String,
    },
    StockMoveCompleted {
        move_id: Uuid,
        move_no: String,
    },
    StockTakingLineAdjusted {
        plan_id: Uuid,
        line_id: Uuid,
        difference: i32,
    },
    StockTakingPlanCompleted {
        plan_id: Uuid,
        plan_no: String,
        diff_count: i32,
    },
    WaveGenerated {
        wave_id: Uuid,
        wave_no: String,
        order_count: i32,
        task_count: i32,
    },
    WaveCompleted {
        wave_id: Uuid,
        wave_no: String,
    },

    SnapshotTaken {
        snapshot_date: NaiveDate,
        record_count: u64,
    },
}

impl Event {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StockPosted { .. } => "stock_posted",
            Event::StockReserved { .. } => "stock_reserved",
            Event::StockReleased { .. } => "stock_released",
            Event::InboundStatusChanged { .. } => "inbound_status_changed",
            Event::OutboundStatusChanged { .. } => "outbound_status_changed",
            Event::StockMoveCompleted { .. } => "stock_move_completed",
            Event::StockTakingLineAdjusted { .. } => "stock_taking_line_adjusted",
            Event::StockTakingPlanCompleted { .. } => "stock_taking_plan_completed",
            Event::WaveGenerated { .. } => "wave_generated",
            Event::WaveCompleted { .. } => "wave_completed",
            Event::SnapshotTaken { .. } => "snapshot_taken",
        }
    }
}

/// Background loop draining the event channel.
///
/// Today this logs every event as a structured record; external consumers
/// (notification fan-out, webhook delivery) subscribe here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockPosted {
                key,
                operation_type,
                business_no,
                quantity_before,
                quantity_change,
                quantity_after,
            } => {
                info!(
                    kind = event.kind(),
                    warehouse_id = %key.warehouse_id,
                    goods_id = %key.goods_id,
                    location_id = %key.location_id,
                    batch_no = %key.batch_no,
                    operation_type = operation_type.as_str(),
                    business_no = %business_no,
                    quantity_before,
                    quantity_change,
                    quantity_after,
                    "ledger posting"
                );
            }
            other => {
                info!(kind = other.kind(), event = ?other, "domain event");
            }
        }
    }

    info!("Event channel closed; stopping event processing loop");
}

/// Builds a connected sender/receiver pair with the given buffer size.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
