//! Snapshot command implementation
//!
//! One reconciliation pass for a wallet against the configured proxy.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use trade_analytics::analytics;
use trade_analytics::client::HttpDataSource;
use trade_analytics::price::PriceService;
use trade_analytics::reconcile::Reconciler;
use trade_analytics::session::SessionStore;
use trade_analytics::Config;

pub fn build_reconciler(config: &Config) -> (Arc<HttpDataSource>, Arc<Reconciler>) {
    let source = Arc::new(HttpDataSource::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    ));
    let prices = Arc::new(PriceService::new(
        source.clone(),
        None,
        chrono::Duration::seconds(config.price_ttl_secs as i64),
        chrono::Duration::seconds(config.secondary_price_ttl_secs as i64),
    ));
    let reconciler = Arc::new(Reconciler::new(
        source.clone(),
        prices,
        config.instrument_map(),
    ));
    (source, reconciler)
}

pub fn load_config(config_path: Option<String>) -> Result<Config> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            Config::from_file(path)
        }
        None => Ok(Config::from_env()),
    }
}

pub async fn run(wallet: String, config_path: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let (_, reconciler) = build_reconciler(&config);

    let store = SessionStore::new();
    let session = store.connect(&wallet).await;

    info!("Reconciling wallet {}", wallet);
    let snapshot = reconciler.reconcile(session.wallet(), &[]).await;
    store.apply(&session, snapshot.clone()).await;

    println!(
        "\n{} trades, {} positions",
        snapshot.trades.len(),
        snapshot.positions.len()
    );

    for position in &snapshot.positions {
        println!(
            "{:<12}  {:?} {:?}  qty {:>10.4}  entry {:>10.4}  mark {:>10.4}  uPnL {:>10.4} ({:.2}%)",
            position.symbol.to_string(),
            position.market,
            position.side,
            position.quantity,
            position.entry_price,
            position.current_price,
            position.unrealized_pnl,
            position.unrealized_pnl_percentage
        );
    }

    let metrics = analytics::portfolio_metrics(&snapshot.trades);
    println!(
        "\nrealized pnl {:.4} over {} closed trades (win rate {:.2}%)",
        metrics.total_pnl, metrics.total_trades, metrics.win_rate
    );

    store.disconnect().await;
    Ok(())
}
