//! wms-core
//!
//! Warehouse inventory ledger and operation state machines: an
//! authoritative stock record store, an append-only inventory log written
//! in lockstep with every mutation, the five order workflows that drive
//! postings (inbound, outbound, stock move, stock taking, picking waves),
//! and the read-only snapshot/warning and reporting projections on top.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod masterdata;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::masterdata::MasterDataRef;
use crate::services::{
    inbound::InboundService, ledger::InventoryLogService, outbound::OutboundService,
    picking::PickingService, reports::ReportService, snapshot::SnapshotService, stock::StockStore,
    stock_move::StockMoveService, stock_taking::StockTakingService,
};

/// Fully wired application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub stock: StockStore,
    pub ledger: InventoryLogService,
    pub inbound: InboundService,
    pub outbound: OutboundService,
    pub stock_move: StockMoveService,
    pub stock_taking: StockTakingService,
    pub picking: PickingService,
    pub snapshot: SnapshotService,
    pub reports: ReportService,
}

impl AppState {
    /// Wires every service against one connection pool and event channel.
    pub fn build(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        masterdata: MasterDataRef,
        event_sender: events::EventSender,
    ) -> Self {
        let stock = StockStore::new(db.clone(), event_sender.clone());
        let ledger = InventoryLogService::new(db.clone());
        let inbound = InboundService::new(db.clone(), stock.clone(), event_sender.clone());
        let outbound = OutboundService::new(db.clone(), stock.clone(), event_sender.clone());
        let stock_move = StockMoveService::new(db.clone(), stock.clone(), event_sender.clone());
        let stock_taking = StockTakingService::new(db.clone(), stock.clone(), event_sender.clone());
        let picking = PickingService::new(db.clone(), event_sender.clone());
        let snapshot = SnapshotService::new(
            db.clone(),
            stock.clone(),
            masterdata.clone(),
            event_sender.clone(),
            config.expiry_warning_days,
        );
        let reports = ReportService::new(db.clone(), masterdata);

        Self {
            db,
            config,
            event_sender,
            stock,
            ledger,
            inbound,
            outbound,
            stock_move,
            stock_taking,
            picking,
            snapshot,
            reports,
        }
    }
}
