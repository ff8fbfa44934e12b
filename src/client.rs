//! HTTP data source
//!
//! Implementation of the upstream traits against the account-data proxy:
//! a small JSON-over-HTTP surface that fronts the exchange SDK. A payload
//! that embeds an `error` field decodes as `UpstreamError::Sdk` instead of
//! a half-valid success.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::types::Symbol;
use crate::upstream::{
    AccountSource, ClientData, OrdersInfo, PriceSource, RawTransaction, RestingOrders,
    SymbolPrice, UpstreamError,
};

/// Either the expected payload or the SDK's embedded error shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Err { error: String },
    Ok(T),
}

#[derive(Debug, Clone)]
pub struct HttpDataSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        HttpDataSource {
            base_url: base_url.into(),
            client,
        }
    }

    fn map_transport(err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Http(err)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(Self::map_transport)?;

        let envelope: Envelope<T> = response.json().await.map_err(Self::map_transport)?;
        match envelope {
            Envelope::Ok(value) => Ok(value),
            Envelope::Err { error } => Err(UpstreamError::Sdk(error)),
        }
    }
}

#[async_trait]
impl AccountSource for HttpDataSource {
    async fn client_data(&self, wallet: &str) -> Result<ClientData, UpstreamError> {
        self.get_json("client-data", &[("wallet", wallet.to_string())])
            .await
    }

    async fn orders_info(
        &self,
        wallet: &str,
        instr_id: u32,
    ) -> Result<OrdersInfo, UpstreamError> {
        self.get_json(
            "orders-info",
            &[
                ("wallet", wallet.to_string()),
                ("instr", instr_id.to_string()),
            ],
        )
        .await
    }

    async fn resting_orders(
        &self,
        wallet: &str,
        instr_id: u32,
        info: &OrdersInfo,
    ) -> Result<RestingOrders, UpstreamError> {
        self.get_json(
            "orders",
            &[
                ("wallet", wallet.to_string()),
                ("instr", instr_id.to_string()),
                ("bidCount", info.bid_count.to_string()),
                ("bidOffset", info.bid_offset.to_string()),
                ("askCount", info.ask_count.to_string()),
                ("askOffset", info.ask_offset.to_string()),
            ],
        )
        .await
    }

    async fn transaction_history(
        &self,
        wallet: &str,
    ) -> Result<Vec<RawTransaction>, UpstreamError> {
        self.get_json("transactions", &[("wallet", wallet.to_string())])
            .await
    }
}

#[async_trait]
impl PriceSource for HttpDataSource {
    async fn fetch_prices(&self) -> Result<HashMap<Symbol, SymbolPrice>, UpstreamError> {
        let raw: HashMap<String, SymbolPrice> = self.get_json("prices", &[]).await?;
        Ok(raw
            .into_iter()
            .map(|(symbol, quote)| (Symbol::new(symbol), quote))
            .collect())
    }
}
