//! Position reconciler
//!
//! Normalizes raw wallet/account data into the canonical trade and position
//! shapes, tolerating partial or total upstream failure. The primary path
//! walks each held instrument; the fallback path reconstructs trades from
//! raw transaction history and derives live positions from the session's
//! cached open trades. `reconcile` never fails: a total outage yields a
//! valid, possibly empty snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::price::{quote_price, PriceService};
use crate::types::{
    FeeBreakdown, MarketKind, OrderKind, Position, Symbol, Trade, TradeSide, TradeStatus,
    WalletSnapshot,
};
use crate::upstream::{
    AccountSource, OrdersInfo, RawTransaction, RestingOrder, SymbolPrice, TxKind, UpstreamError,
};

/// Instrument-id to symbol mapping
#[derive(Debug, Clone, Default)]
pub struct InstrumentMap {
    symbols: HashMap<u32, Symbol>,
}

impl InstrumentMap {
    pub fn new(pairs: impl IntoIterator<Item = (u32, Symbol)>) -> Self {
        InstrumentMap {
            symbols: pairs.into_iter().collect(),
        }
    }

    /// Symbol for an instrument; unmapped ids get a synthetic label so the
    /// record is still representable downstream
    pub fn symbol_for(&self, instr_id: u32) -> Symbol {
        self.symbols
            .get(&instr_id)
            .cloned()
            .unwrap_or_else(|| Symbol::new(format!("INSTR-{}/USDC", instr_id)))
    }
}

/// Side inference for raw transactions that lack an explicit side
///
/// This is a heuristic, not ground truth: the raw record carries no
/// authoritative direction, so implementations approximate. Injectable so
/// tests can pin a deterministic strategy.
pub trait SideInference: Send + Sync {
    fn infer(&self, tx: &RawTransaction, index: usize) -> TradeSide;
}

/// Default heuristic: sign of the native-balance delta (spending balance
/// reads as a buy), alternating by record index when the delta is absent
/// or zero
pub struct BalanceDeltaSide;

impl SideInference for BalanceDeltaSide {
    fn infer(&self, tx: &RawTransaction, index: usize) -> TradeSide {
        match tx.sol_change {
            Some(delta) if delta < 0.0 => TradeSide::Long,
            Some(delta) if delta > 0.0 => TradeSide::Short,
            _ => {
                if index % 2 == 0 {
                    TradeSide::Long
                } else {
                    TradeSide::Short
                }
            }
        }
    }
}

/// Derives the `{ trades, positions }` view for one wallet
pub struct Reconciler {
    account: Arc<dyn AccountSource>,
    prices: Arc<PriceService>,
    instruments: InstrumentMap,
    side_inference: Arc<dyn SideInference>,
}

impl Reconciler {
    pub fn new(
        account: Arc<dyn AccountSource>,
        prices: Arc<PriceService>,
        instruments: InstrumentMap,
    ) -> Self {
        Reconciler {
            account,
            prices,
            instruments,
            side_inference: Arc::new(BalanceDeltaSide),
        }
    }

    pub fn with_side_inference(mut self, inference: Arc<dyn SideInference>) -> Self {
        self.side_inference = inference;
        self
    }

    /// One full reconciliation pass
    ///
    /// `session_trades` is the session's current trade list; its open trades
    /// seed the fallback position derivation when the account query is
    /// unavailable. Infallible by contract.
    pub async fn reconcile(&self, wallet: &str, session_trades: &[Trade]) -> WalletSnapshot {
        let book = self.prices.price_book().await;

        let client = match self.account.client_data(wallet).await {
            Ok(client) => client,
            Err(err) => {
                warn!("client data unavailable for {}: {}", wallet, err);
                return self.fallback(wallet, session_trades, &book).await;
            }
        };

        // No on-chain account is a well-formed empty result, not an error
        if !client.has_account {
            debug!("wallet {} has no account", wallet);
            return WalletSnapshot::default();
        }

        let mut held: Vec<(u32, MarketKind)> = client
            .spot_positions
            .iter()
            .map(|p| (p.instr_id, MarketKind::Spot))
            .chain(
                client
                    .perp_positions
                    .iter()
                    .map(|p| (p.instr_id, MarketKind::Perpetual)),
            )
            .collect();
        // Merge order is completion-order independent; sorting by instrument
        // id keeps the assembled output deterministic
        held.sort_by_key(|(id, _)| *id);

        let fetches = held
            .iter()
            .map(|(instr_id, kind)| self.instrument_view(wallet, *instr_id, *kind, &book));
        let results = join_all(fetches).await;

        let mut trades = Vec::new();
        let mut positions = Vec::new();
        let mut failed = 0_usize;

        for ((instr_id, _), result) in held.iter().zip(results) {
            match result {
                Ok((mut t, mut p)) => {
                    trades.append(&mut t);
                    positions.append(&mut p);
                }
                Err(err) => {
                    warn!("skipping instrument {}: {}", instr_id, err);
                    failed += 1;
                }
            }
        }

        // Every instrument failing means the upstream is down, not noisy
        if failed > 0 && failed == held.len() && !held.is_empty() {
            return self.fallback(wallet, session_trades, &book).await;
        }

        WalletSnapshot { trades, positions }
    }

    /// Primary path for one held instrument; failures are isolated here so
    /// one instrument cannot cancel its siblings
    async fn instrument_view(
        &self,
        wallet: &str,
        instr_id: u32,
        kind: MarketKind,
        book: &HashMap<Symbol, SymbolPrice>,
    ) -> Result<(Vec<Trade>, Vec<Position>), UpstreamError> {
        let info = self.account.orders_info(wallet, instr_id).await?;
        let orders = self.account.resting_orders(wallet, instr_id, &info).await?;

        let symbol = self.instruments.symbol_for(instr_id);
        let mark = self.prices.resolve(&symbol, book).await;

        let mut trades = Vec::new();
        for bid in &orders.bids {
            if let Some(trade) = resting_trade(&symbol, kind, TradeSide::Long, bid, mark) {
                trades.push(trade);
            }
        }
        for ask in &orders.asks {
            if let Some(trade) = resting_trade(&symbol, kind, TradeSide::Short, ask, mark) {
                trades.push(trade);
            }
        }

        let mut positions = Vec::new();
        if kind == MarketKind::Perpetual {
            if let Some((trade, position)) =
                self.perp_position(&symbol, instr_id, &info, mark)
            {
                trades.push(trade);
                positions.push(position);
            }
        }

        Ok((trades, positions))
    }

    /// Synthesize the live perp exposure from the instrument's position block
    fn perp_position(
        &self,
        symbol: &Symbol,
        instr_id: u32,
        info: &OrdersInfo,
        mark: f64,
    ) -> Option<(Trade, Position)> {
        let perp = info.perp.as_ref()?;
        if perp.perps == 0.0 {
            return None;
        }

        let quantity = perp.perps.abs();
        // Entry price backed out of the signed cost basis
        let entry_price = (perp.cost / perp.perps).abs();
        let side = if perp.perps > 0.0 {
            TradeSide::Long
        } else {
            TradeSide::Short
        };
        let leverage = (perp.leverage > 0.0).then_some(perp.leverage);
        let open_time = Utc::now();

        let trade = Trade {
            id: format!("perp-{}", instr_id),
            tx_ref: format!("perp-{}", instr_id),
            symbol: symbol.clone(),
            market: MarketKind::Perpetual,
            side,
            order_kind: OrderKind::Market,
            status: TradeStatus::Open,
            entry_price,
            current_price: Some(mark),
            exit_price: None,
            quantity,
            leverage,
            entry_time: open_time,
            exit_time: None,
            pnl: None,
            pnl_percentage: None,
            fees: FeeBreakdown::new(0.0, perp.fees.max(0.0), Some(perp.funding_funds)),
            note: None,
            tags: None,
        };

        let mut position = Position {
            id: format!("perp-{}", instr_id),
            symbol: symbol.clone(),
            market: MarketKind::Perpetual,
            side,
            entry_price,
            current_price: mark,
            quantity,
            leverage,
            unrealized_pnl: 0.0,
            unrealized_pnl_percentage: 0.0,
            margin: (perp.funds > 0.0).then_some(perp.funds),
            liquidation_price: None,
            open_time,
        };
        position.mark(mark);

        Some((trade, position))
    }

    /// Re-resolve marks for an existing snapshot
    ///
    /// Used by the periodic refresh: recomputes `current_price` for open
    /// trades and re-marks every position against the latest price table,
    /// falling back to the last known price when the feed has no quote for
    /// a symbol. Closed trades are untouched.
    pub async fn refresh_marks(&self, snapshot: &mut WalletSnapshot) {
        let book = self.prices.price_book().await;

        for trade in snapshot
            .trades
            .iter_mut()
            .filter(|t| t.status == TradeStatus::Open)
        {
            let mark = book
                .get(&trade.symbol)
                .and_then(quote_price)
                .or(trade.current_price)
                .unwrap_or(trade.entry_price);
            trade.current_price = Some(mark);
        }

        for position in snapshot.positions.iter_mut() {
            let mark = book
                .get(&position.symbol)
                .and_then(quote_price)
                .unwrap_or(position.current_price);
            position.mark(mark);
        }
    }

    /// Fallback path: history-based trades plus positions derived from the
    /// session's cached open trades instead of the account query
    async fn fallback(
        &self,
        wallet: &str,
        session_trades: &[Trade],
        book: &HashMap<Symbol, SymbolPrice>,
    ) -> WalletSnapshot {
        warn!(
            "upstream degraded for {}; reconstructing from transaction history",
            wallet
        );

        let mut trades = match self.account.transaction_history(wallet).await {
            Ok(txs) => self.trades_from_history(&txs),
            Err(err) => {
                warn!("transaction history unavailable for {}: {}", wallet, err);
                Vec::new()
            }
        };

        let mut positions = Vec::new();
        for trade in session_trades
            .iter()
            .filter(|t| t.status == TradeStatus::Open)
        {
            // Latest price table first, then the trade's last known price
            let mark = book
                .get(&trade.symbol)
                .and_then(quote_price)
                .or(trade.current_price)
                .unwrap_or(trade.entry_price);

            let mut refreshed = trade.clone();
            refreshed.current_price = Some(mark);

            let mut position = Position {
                id: refreshed.id.clone(),
                symbol: refreshed.symbol.clone(),
                market: refreshed.market,
                side: refreshed.side,
                entry_price: refreshed.entry_price,
                current_price: mark,
                quantity: refreshed.quantity,
                leverage: refreshed.leverage,
                unrealized_pnl: 0.0,
                unrealized_pnl_percentage: 0.0,
                margin: None,
                liquidation_price: None,
                open_time: refreshed.entry_time,
            };
            position.mark(mark);

            positions.push(position);
            trades.push(refreshed);
        }

        WalletSnapshot { trades, positions }
    }

    /// Reconstruct executed trades from raw transaction records
    ///
    /// Skips transaction kinds that are not executable trades (deposits,
    /// withdrawals, cancels, unfilled order placements). The realized pnl of
    /// a reconstructed fill is approximated by the record's balance delta,
    /// the only outcome signal the raw feed carries.
    fn trades_from_history(&self, txs: &[RawTransaction]) -> Vec<Trade> {
        let mut trades: Vec<Trade> = txs
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.kind == TxKind::Trade)
            .filter_map(|(index, tx)| self.trade_from_tx(tx, index))
            .collect();

        trades.sort_by_key(|t| t.entry_time);
        trades
    }

    fn trade_from_tx(&self, tx: &RawTransaction, index: usize) -> Option<Trade> {
        let instr_id = tx.instr_id?;
        let quantity = tx.size.map(f64::abs).filter(|q| *q > 0.0)?;
        let symbol = self.instruments.symbol_for(instr_id);

        let side = match tx.side.as_deref() {
            Some("long") => TradeSide::Long,
            Some("short") => TradeSide::Short,
            _ => self.side_inference.infer(tx, index),
        };

        let entry_price = tx
            .price
            .unwrap_or_else(|| crate::price::default_price(symbol.as_str()));
        let timestamp = Utc
            .timestamp_opt(tx.timestamp, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Some(Trade {
            id: format!("tx-{}", tx.signature),
            tx_ref: tx.signature.clone(),
            symbol,
            market: MarketKind::Perpetual,
            side,
            order_kind: OrderKind::Market,
            status: TradeStatus::Closed,
            entry_price,
            current_price: None,
            exit_price: Some(entry_price),
            quantity,
            leverage: None,
            entry_time: timestamp,
            exit_time: Some(timestamp),
            pnl: Some(tx.sol_change.unwrap_or(0.0)),
            pnl_percentage: None,
            fees: FeeBreakdown::new(0.0, tx.fee, None),
            note: None,
            tags: None,
        })
    }
}

/// Synthetic open trade for one resting order
///
/// The order list carries no usable price, so the current mid price stands
/// in for the entry.
fn resting_trade(
    symbol: &Symbol,
    market: MarketKind,
    side: TradeSide,
    order: &RestingOrder,
    mark: f64,
) -> Option<Trade> {
    let remaining = order.quantity - order.filled;
    if remaining <= 0.0 {
        return None;
    }

    let entry_time = Utc
        .timestamp_opt(order.timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now);

    Some(Trade {
        id: format!("order-{}", order.order_id),
        tx_ref: format!("order-{}", order.order_id),
        symbol: symbol.clone(),
        market,
        side,
        order_kind: OrderKind::Limit,
        status: TradeStatus::Open,
        entry_price: mark,
        current_price: Some(mark),
        exit_price: None,
        quantity: remaining,
        leverage: None,
        entry_time,
        exit_time: None,
        pnl: None,
        pnl_percentage: None,
        fees: FeeBreakdown::default(),
        note: None,
        tags: None,
    })
}
