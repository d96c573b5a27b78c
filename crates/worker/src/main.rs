//! Long-running housekeeping process: auto-cancels stale orders and purges panel line
//! items of completed orders on a fixed interval.

use std::sync::Arc;

use anyhow::Context;

use panelstock_infra::{
    HousekeepingScheduler, InMemoryStore, InventoryStore, OrderService, PanelstockConfig, PgInventoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panelstock_observability::init();

    let config = PanelstockConfig::from_env().context("invalid configuration")?;
    let mut shown = config.clone();
    if shown.store.database_url.is_some() {
        shown.store.database_url = Some("<redacted>".to_string());
    }
    tracing::info!(config = %serde_json::to_string(&shown)?, "configuration loaded");

    match config.store.database_url.clone() {
        Some(url) => {
            let store = PgInventoryStore::connect(&url, config.store.lock_timeout())
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            run(store, config).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running against an in-memory store");
            run(InMemoryStore::new(config.store.lock_timeout()), config).await
        }
    }
}

async fn run<S: InventoryStore + 'static>(store: S, config: PanelstockConfig) -> anyhow::Result<()> {
    let service = OrderService::new(Arc::new(store), config.store.conflict_retry());
    let handle = HousekeepingScheduler::new(service, config.housekeeping).spawn();

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!(stats = ?handle.stats(), "shutting down");
    handle.shutdown().await;
    Ok(())
}
