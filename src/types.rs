//! Core data types shared by the metrics engine and the position reconciler

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for trade records
#[derive(Debug, Error)]
pub enum TradeValidationError {
    #[error("quantity ({0}) must be > 0")]
    NonPositiveQuantity(f64),

    #[error("closed trade is missing exit price, exit time or pnl")]
    MissingExitFields,

    #[error("open trade carries exit fields")]
    UnexpectedExitFields,

    #[error("exit time ({exit}) precedes entry time ({entry})")]
    ExitBeforeEntry {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },

    #[error("total fee ({total}) does not match maker + taker + funding ({expected})")]
    InconsistentFees { total: f64, expected: f64 },
}

/// Trading pair symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned on every bucket, cache entry and filter pass.
/// Using Arc<str> instead of String reduces heap allocations from O(n) to O(1) per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market the trade was executed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Perpetual,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Directional multiplier: +1 for long, -1 for short
    pub fn direction(self) -> f64 {
        match self {
            TradeSide::Long => 1.0,
            TradeSide::Short => -1.0,
        }
    }
}

/// Order kind the trade originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Stop => write!(f, "stop"),
            OrderKind::StopLimit => write!(f, "stop-limit"),
        }
    }
}

/// Trade lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
    Liquidated,
}

/// Fees attached to one trade
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub maker_fee: f64,
    pub taker_fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_fee: Option<f64>,
    pub total_fee: f64,
}

impl FeeBreakdown {
    /// Build a breakdown with the total derived from its parts
    pub fn new(maker_fee: f64, taker_fee: f64, funding_fee: Option<f64>) -> Self {
        FeeBreakdown {
            maker_fee,
            taker_fee,
            funding_fee,
            total_fee: maker_fee + taker_fee + funding_fee.unwrap_or(0.0),
        }
    }
}

/// One executed or resting order, normalized from upstream data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    /// External transaction reference (signature or order id)
    pub tx_ref: String,
    pub symbol: Symbol,
    pub market: MarketKind,
    pub side: TradeSide,
    pub order_kind: OrderKind,
    pub status: TradeStatus,
    pub entry_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
    pub entry_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_percentage: Option<f64>,
    pub fees: FeeBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Trade {
    /// Closed with a realized pnl; the subset all performance stats run over
    pub fn is_closed_with_pnl(&self) -> bool {
        self.status == TradeStatus::Closed && self.pnl.is_some()
    }

    /// Notional entry volume
    pub fn volume(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Holding duration in seconds, when both timestamps exist
    pub fn duration_secs(&self) -> Option<f64> {
        self.exit_time
            .map(|exit| (exit - self.entry_time).num_milliseconds() as f64 / 1000.0)
    }

    /// Directional pnl against a mark price
    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        (mark_price - self.entry_price) * self.quantity * self.side.direction()
    }

    /// Mark a trade closed, realizing pnl at the given exit
    pub fn close(&mut self, exit_price: f64, exit_time: DateTime<Utc>) {
        let pnl = self.unrealized_pnl(exit_price);
        self.status = TradeStatus::Closed;
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.pnl = Some(pnl);
        self.pnl_percentage = if self.volume() > 0.0 {
            Some(pnl / self.volume() * 100.0)
        } else {
            None
        };
    }

    /// Validate the record invariants
    pub fn validate(&self) -> Result<(), TradeValidationError> {
        if self.quantity <= 0.0 {
            return Err(TradeValidationError::NonPositiveQuantity(self.quantity));
        }

        match self.status {
            TradeStatus::Closed => {
                if self.exit_price.is_none() || self.exit_time.is_none() || self.pnl.is_none() {
                    return Err(TradeValidationError::MissingExitFields);
                }
            }
            TradeStatus::Open => {
                if self.exit_price.is_some() || self.exit_time.is_some() || self.pnl.is_some() {
                    return Err(TradeValidationError::UnexpectedExitFields);
                }
            }
            TradeStatus::Liquidated => {}
        }

        if let Some(exit) = self.exit_time {
            if exit < self.entry_time {
                return Err(TradeValidationError::ExitBeforeEntry {
                    entry: self.entry_time,
                    exit,
                });
            }
        }

        let expected =
            self.fees.maker_fee + self.fees.taker_fee + self.fees.funding_fee.unwrap_or(0.0);
        if (self.fees.total_fee - expected).abs() > 1e-9 {
            return Err(TradeValidationError::InconsistentFees {
                total: self.fees.total_fee,
                expected,
            });
        }

        Ok(())
    }
}

/// A live open exposure, recomputed (never patched) on each refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: Symbol,
    pub market: MarketKind,
    pub side: TradeSide,
    pub entry_price: f64,
    pub current_price: f64,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
    pub open_time: DateTime<Utc>,
}

impl Position {
    /// Recompute the mark price and both pnl fields against a new price
    pub fn mark(&mut self, current_price: f64) {
        self.current_price = current_price;
        self.unrealized_pnl =
            (current_price - self.entry_price) * self.quantity * self.side.direction();
        let notional = self.entry_price * self.quantity;
        self.unrealized_pnl_percentage = if notional > 0.0 {
            self.unrealized_pnl / notional * 100.0
        } else {
            0.0
        };
    }
}

/// Normalized view of one wallet: open/closed trades plus live positions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub trades: Vec<Trade>,
    pub positions: Vec<Position>,
}

/// Aggregate performance snapshot over a trade set
///
/// Recomputed on every query, never persisted. `Default` is the documented
/// all-zero contract for an empty input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_pnl: f64,
    /// Entry notional over ALL input trades, closed or not
    pub total_volume: f64,
    pub total_fees: f64,
    /// Count of closed trades with a realized pnl
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub average_duration_secs: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percentage: f64,
    pub long_short_ratio: f64,
}

/// Per-hour performance bucket; 24 entries are always emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyMetrics {
    pub hour: u32,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

/// Fixed UTC time-of-day windows used for performance-by-region analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingSession {
    /// UTC [0, 8)
    Asian,
    /// UTC [8, 16)
    European,
    /// UTC [16, 24)
    American,
}

impl TradingSession {
    pub const ALL: [TradingSession; 3] = [
        TradingSession::Asian,
        TradingSession::European,
        TradingSession::American,
    ];

    /// Session window containing the given UTC hour
    pub fn from_utc_hour(hour: u32) -> Self {
        match hour {
            0..=7 => TradingSession::Asian,
            8..=15 => TradingSession::European,
            _ => TradingSession::American,
        }
    }
}

impl std::fmt::Display for TradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingSession::Asian => write!(f, "asian"),
            TradingSession::European => write!(f, "european"),
            TradingSession::American => write!(f, "american"),
        }
    }
}

/// Per-session performance bucket; exactly three entries are always emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub session: TradingSession,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub average_duration_secs: f64,
}

/// Per-symbol performance bucket, ranked by volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub symbol: Symbol,
    /// Realized pnl over the closed subset only
    pub pnl: f64,
    /// Entry notional over all trades of the symbol
    pub volume: f64,
    pub fees: f64,
    /// Closed-trade count
    pub trade_count: usize,
    pub win_rate: f64,
    pub average_pnl: f64,
}

/// One calendar day of fees plus the running total up to that day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyFee {
    pub date: NaiveDate,
    pub fee: f64,
    pub cumulative: f64,
}

/// Fee totals across all input trades plus the per-day series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeSummary {
    pub maker: f64,
    pub taker: f64,
    pub funding: f64,
    pub total: f64,
    pub daily: Vec<DailyFee>,
}

/// Per-order-kind performance bucket over closed trades
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTypeMetrics {
    pub order_kind: OrderKind,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub average_duration_secs: f64,
}

/// User-supplied predicate over trades; AND semantics across non-empty fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markets: Vec<MarketKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sides: Vec<TradeSide>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<TradeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pnl: Option<f64>,
}

impl FilterOptions {
    /// True when the trade satisfies every non-empty field
    ///
    /// Date bounds are inclusive on both ends. Pnl bounds are evaluated
    /// against `pnl.unwrap_or(0.0)`: a trade without a realized pnl is
    /// compared as zero rather than excluded.
    pub fn matches(&self, trade: &Trade) -> bool {
        if let Some(from) = self.date_from {
            if trade.entry_time < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if trade.entry_time > to {
                return false;
            }
        }
        if !self.symbols.is_empty() && !self.symbols.contains(&trade.symbol) {
            return false;
        }
        if !self.markets.is_empty() && !self.markets.contains(&trade.market) {
            return false;
        }
        if !self.sides.is_empty() && !self.sides.contains(&trade.side) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&trade.status) {
            return false;
        }

        let pnl = trade.pnl.unwrap_or(0.0);
        if let Some(min) = self.min_pnl {
            if pnl < min {
                return false;
            }
        }
        if let Some(max) = self.max_pnl {
            if pnl > max {
                return false;
            }
        }

        true
    }
}
