//! Configuration management
//!
//! JSON configuration with environment-variable overrides for the proxy
//! endpoint. Every field has a serde default, so a partial config file (or
//! none at all) still yields a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::reconcile::InstrumentMap;
use crate::types::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the account-data proxy
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// TTL of the interactive price cache
    pub price_ttl_secs: u64,
    /// TTL of the secondary fallback feed cache
    pub secondary_price_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    /// Instrument-id to symbol mapping
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub instr_id: u32,
    pub symbol: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: 10,
            price_ttl_secs: 10,
            secondary_price_ttl_secs: 60,
            refresh_interval_secs: 30,
            instruments: vec![
                InstrumentConfig {
                    instr_id: 0,
                    symbol: "SOL/USDC".to_string(),
                },
                InstrumentConfig {
                    instr_id: 1,
                    symbol: "BTC/USDC".to_string(),
                },
                InstrumentConfig {
                    instr_id: 2,
                    symbol: "ETH/USDC".to_string(),
                },
                InstrumentConfig {
                    instr_id: 3,
                    symbol: "JTO/USDC".to_string(),
                },
                InstrumentConfig {
                    instr_id: 4,
                    symbol: "WIF/USDC".to_string(),
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from JSON file, then apply env overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Built-in defaults plus env overrides, for when no file is given
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("ANALYTICS_BASE_URL") {
            self.base_url = base_url;
        }
    }

    pub fn instrument_map(&self) -> InstrumentMap {
        InstrumentMap::new(
            self.instruments
                .iter()
                .map(|i| (i.instr_id, Symbol::new(&i.symbol))),
        )
    }
}
