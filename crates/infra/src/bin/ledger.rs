//! Ledger health check: stock alerts and per-product reconciliation, as JSON.
//!
//! Uses PostgreSQL when `database.url` is configured (migrating it first),
//! otherwise an empty in-memory store.

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing::info;

use backoffice_infra::{InMemoryLedgerStore, LedgerConfig, LedgerServices, LedgerStore, PostgresLedgerStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::load().context("loading configuration")?;
    backoffice_observability::init(&config.log);

    let store: Arc<dyn LedgerStore> = if config.database.is_configured() {
        let store = PostgresLedgerStore::connect(&config.database)
            .await
            .context("connecting to the ledger database")?;
        store.migrate().await.context("applying ledger migrations")?;
        info!("using PostgreSQL ledger store");
        Arc::new(store)
    } else {
        info!("database.url not set; using in-memory ledger store");
        Arc::new(InMemoryLedgerStore::new())
    };

    let services = LedgerServices::new(store, config.transactions);
    let alerts = services.alerts.stock_alerts().await?;
    let reconciliation = services.alerts.reconcile_all().await?;
    let drifted = reconciliation.iter().filter(|r| !r.consistent).count();

    let report = json!({
        "alerts": alerts,
        "reconciliation": reconciliation,
        "drifted_products": drifted,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if drifted > 0 {
        anyhow::bail!("{drifted} product(s) drifted from their ledger");
    }
    Ok(())
}
