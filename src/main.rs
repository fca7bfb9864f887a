use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};

use wms_core::{config, db, events, masterdata, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let (event_sender, event_rx) = events::channel(cfg.event_buffer);
    tokio::spawn(events::process_events(event_rx));

    // Master data is injected; deployments replace this with their own
    // lookup client.
    let lookup: masterdata::MasterDataRef = Arc::new(masterdata::InMemoryMasterData::new());

    let snapshot_interval = Duration::from_secs(cfg.snapshot_interval_secs);
    let state = AppState::build(Arc::new(db_pool), cfg, lookup, event_sender);

    let snapshot = state.snapshot.clone();
    tokio::spawn(snapshot.run_scheduler(snapshot_interval));

    info!("wms-core started; snapshot scheduler running");
    signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}
