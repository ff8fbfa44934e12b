//! Trade-log loading
//!
//! Reads exported trade logs for offline analysis: JSON (the canonical
//! serialized `Trade` shape) and CSV with a fixed column set. Timestamps
//! accept RFC 3339 or naive `YYYY-MM-DD HH:MM:SS` assumed UTC.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::{
    FeeBreakdown, MarketKind, OrderKind, Symbol, Trade, TradeSide, TradeStatus,
};

/// Parse a timestamp, trying RFC 3339 first and naive UTC second
fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .context(format!("Failed to parse timestamp: {}", s))
}

/// One CSV row of an exported trade log
#[derive(Debug, Deserialize)]
struct CsvTrade {
    id: String,
    symbol: String,
    market: MarketKind,
    side: TradeSide,
    order_kind: OrderKind,
    status: TradeStatus,
    entry_price: f64,
    quantity: f64,
    entry_time: String,
    #[serde(default)]
    exit_price: Option<f64>,
    #[serde(default)]
    exit_time: Option<String>,
    #[serde(default)]
    pnl: Option<f64>,
    #[serde(default)]
    maker_fee: f64,
    #[serde(default)]
    taker_fee: f64,
    #[serde(default)]
    funding_fee: Option<f64>,
}

impl CsvTrade {
    fn into_trade(self) -> Result<Trade> {
        let entry_time = parse_time(&self.entry_time)?;
        let exit_time = self
            .exit_time
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_time)
            .transpose()?;

        Ok(Trade {
            tx_ref: self.id.clone(),
            id: self.id,
            symbol: Symbol::new(self.symbol),
            market: self.market,
            side: self.side,
            order_kind: self.order_kind,
            status: self.status,
            entry_price: self.entry_price,
            current_price: None,
            exit_price: self.exit_price,
            quantity: self.quantity,
            leverage: None,
            entry_time,
            exit_time,
            pnl: self.pnl,
            pnl_percentage: None,
            fees: FeeBreakdown::new(self.maker_fee, self.taker_fee, self.funding_fee),
            note: None,
            tags: None,
        })
    }
}

/// Load a trade log from CSV
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Trade>> {
    let mut reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;

    let mut trades = Vec::new();
    for (row_idx, result) in reader.deserialize::<CsvTrade>().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;
        let trade = record
            .into_trade()
            .context(format!("Invalid trade in row {}", row_idx + 1))?;
        trades.push(trade);
    }

    info!(
        "Loaded {} trades from {}",
        trades.len(),
        path.as_ref().display()
    );
    Ok(trades)
}

/// Load a trade log from JSON (an array of serialized trades)
pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<Trade>> {
    let contents = fs::read_to_string(path.as_ref()).context("Failed to read JSON file")?;
    let trades: Vec<Trade> =
        serde_json::from_str(&contents).context("Failed to parse trade JSON")?;

    info!(
        "Loaded {} trades from {}",
        trades.len(),
        path.as_ref().display()
    );
    Ok(trades)
}

/// Load a trade log, dispatching on file extension
pub fn load_trades(path: impl AsRef<Path>) -> Result<Vec<Trade>> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path),
        Some("json") => load_json(path),
        other => bail!("Unsupported trade log format: {:?}", other),
    }
}
