//! Upstream collaborator interfaces
//!
//! Wire types and traits for the external data the reconciler consumes:
//! account/client data, per-instrument order info and order lists, the live
//! price feed, and the raw transaction history used by the fallback path.
//! An upstream that embeds an error string in an otherwise-valid payload
//! surfaces it as `UpstreamError::Sdk`, never as a half-populated success.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Symbol;

/// Failure taxonomy for any external fetch; always non-fatal to the caller
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode upstream payload: {0}")]
    Decode(String),

    #[error("upstream SDK reported an error: {0}")]
    Sdk(String),

    #[error("upstream request timed out")]
    Timeout,
}

/// Wallet account summary returned by the client-data endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    pub has_account: bool,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub spot_trades: u64,
    #[serde(default)]
    pub perp_trades: u64,
    #[serde(default)]
    pub lp_trades: u64,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub balances: Vec<TokenBalance>,
    #[serde(default)]
    pub spot_positions: Vec<InstrumentRef>,
    #[serde(default)]
    pub perp_positions: Vec<InstrumentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token_id: u32,
    pub amount: f64,
}

/// One held instrument as referenced by the account state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRef {
    pub instr_id: u32,
    pub client_id: i64,
}

/// Resting-order counts/offsets plus the perp position block for one instrument
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersInfo {
    #[serde(default)]
    pub bid_count: u32,
    #[serde(default)]
    pub bid_offset: u32,
    #[serde(default)]
    pub ask_count: u32,
    #[serde(default)]
    pub ask_offset: u32,
    #[serde(default)]
    pub perp: Option<PerpDetails>,
}

/// Perpetual position fields as reported by the instrument endpoint
///
/// `perps` is the signed position size; `cost` is the signed entry notional,
/// so entry price backs out as `abs(cost / perps)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpDetails {
    pub perps: f64,
    pub funds: f64,
    #[serde(default)]
    pub in_orders_perps: f64,
    #[serde(default)]
    pub in_orders_funds: f64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default)]
    pub rebates: f64,
    #[serde(default)]
    pub result: f64,
    pub cost: f64,
    #[serde(default)]
    pub leverage: f64,
    #[serde(default)]
    pub funding_funds: f64,
    #[serde(default)]
    pub soc_loss_funds: f64,
}

/// Resting bids and asks for one instrument
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestingOrders {
    #[serde(default)]
    pub bids: Vec<RestingOrder>,
    #[serde(default)]
    pub asks: Vec<RestingOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingOrder {
    pub order_id: u64,
    pub line: u32,
    pub quantity: f64,
    #[serde(default)]
    pub filled: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

/// One symbol's live quote from the price feed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPrice {
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub best_bid: Option<f64>,
    #[serde(default)]
    pub best_ask: Option<f64>,
    #[serde(default)]
    pub mid_price: Option<f64>,
}

/// Transaction kinds found in the raw history feed
///
/// Only `Trade` records are executable trades; the rest are skipped by the
/// fallback reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Trade,
    Deposit,
    Withdrawal,
    Cancel,
    #[serde(rename = "place-order")]
    PlaceOrder,
    #[serde(other)]
    Unknown,
}

/// Raw transaction record from the history feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub signature: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(default)]
    pub instr_id: Option<u32>,
    /// Explicit side when the record carries one ("long"/"short")
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    /// Native-balance delta caused by the transaction
    #[serde(default)]
    pub sol_change: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub fee: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

/// Account-side data source: client data, per-instrument orders, history
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn client_data(&self, wallet: &str) -> Result<ClientData, UpstreamError>;

    async fn orders_info(&self, wallet: &str, instr_id: u32)
        -> Result<OrdersInfo, UpstreamError>;

    async fn resting_orders(
        &self,
        wallet: &str,
        instr_id: u32,
        info: &OrdersInfo,
    ) -> Result<RestingOrders, UpstreamError>;

    async fn transaction_history(
        &self,
        wallet: &str,
    ) -> Result<Vec<RawTransaction>, UpstreamError>;
}

/// Live price table source
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self) -> Result<HashMap<Symbol, SymbolPrice>, UpstreamError>;
}
