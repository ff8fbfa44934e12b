//! Watch command implementation
//!
//! Reconcile a wallet, then keep open-trade marks fresh on the configured
//! interval until interrupted. Disconnect tears everything down.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use trade_analytics::refresh::RefreshTask;
use trade_analytics::session::SessionStore;

use super::snapshot::{build_reconciler, load_config};

pub async fn run(wallet: String, config_path: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let (_, reconciler) = build_reconciler(&config);

    let store = SessionStore::new();
    let session = store.connect(&wallet).await;

    info!("Reconciling wallet {}", wallet);
    let snapshot = reconciler.reconcile(session.wallet(), &[]).await;
    let trade_count = snapshot.trades.len();
    store.apply(&session, snapshot).await;
    info!("Initial snapshot: {} trades", trade_count);

    // The refresh loop only runs for a session with trades to mark
    let task = if trade_count > 0 {
        Some(RefreshTask::spawn(
            Duration::from_secs(config.refresh_interval_secs),
            reconciler,
            store.clone(),
            session.clone(),
        ))
    } else {
        info!("No trades; skipping refresh loop");
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Interrupted; disconnecting");

    if let Some(task) = task {
        task.stop();
    }
    store.disconnect().await;

    Ok(())
}
