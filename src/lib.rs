//! Trade Analytics
//!
//! Analytics and reconciliation core for an on-chain trading account:
//! a pure metrics engine over trade logs (pnl, drawdown, win rate, session
//! and fee breakdowns) and a position reconciler that normalizes raw
//! wallet data into trades and positions, with heuristic fallbacks when
//! the upstream is degraded.

pub mod analytics;
pub mod client;
pub mod config;
pub mod data;
pub mod price;
pub mod reconcile;
pub mod refresh;
pub mod session;
pub mod types;
pub mod upstream;

pub use config::Config;
pub use types::*;
