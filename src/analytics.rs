//! Metrics engine
//!
//! Pure aggregation over a trade log: portfolio totals, drawdown, and the
//! hourly / session / symbol / fee / order-type breakdowns. Every function
//! here is total: empty or partially-populated input yields the documented
//! zero-valued result, never an error.

use std::collections::{BTreeMap, HashMap};

use chrono::{TimeZone, Timelike};

use crate::types::{
    DailyFee, FeeSummary, FilterOptions, HourlyMetrics, OrderKind, OrderTypeMetrics,
    PortfolioMetrics, SessionMetrics, Symbol, SymbolMetrics, Trade, TradeSide, TradingSession,
};

/// Win rate as a percentage; 0 for an empty bucket
fn win_rate(wins: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        wins as f64 / count as f64 * 100.0
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Apply a filter with AND semantics across its non-empty fields
pub fn apply_filter(trades: &[Trade], filter: &FilterOptions) -> Vec<Trade> {
    trades
        .iter()
        .filter(|t| filter.matches(t))
        .cloned()
        .collect()
}

/// Portfolio-level aggregate over a trade set
///
/// PnL statistics run over the closed-with-pnl subset. Volume and fees are
/// the deliberate asymmetry: they sum over ALL input trades, so open
/// exposure still counts toward activity. When no trade is closed the
/// all-zero record is returned.
pub fn portfolio_metrics(trades: &[Trade]) -> PortfolioMetrics {
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed_with_pnl()).collect();
    if closed.is_empty() {
        return PortfolioMetrics::default();
    }

    let total_pnl: f64 = closed.iter().map(|t| t.pnl.unwrap_or(0.0)).sum();
    let total_volume: f64 = trades.iter().map(|t| t.volume()).sum();
    let total_fees: f64 = trades.iter().map(|t| t.fees.total_fee).sum();

    // Trades with pnl == 0 count toward neither wins nor losses
    let wins: Vec<f64> = closed
        .iter()
        .filter_map(|t| t.pnl.filter(|p| *p > 0.0))
        .collect();
    let losses: Vec<f64> = closed
        .iter()
        .filter_map(|t| t.pnl.filter(|p| *p < 0.0))
        .map(f64::abs)
        .collect();

    let gross_wins: f64 = wins.iter().sum();
    let gross_losses: f64 = losses.iter().sum();

    let profit_factor = if gross_losses > 0.0 {
        gross_wins / gross_losses
    } else if gross_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let largest_win = wins.iter().copied().fold(0.0, f64::max);
    let largest_loss = losses.iter().copied().fold(0.0, f64::max);

    let durations: Vec<f64> = closed.iter().filter_map(|t| t.duration_secs()).collect();
    let average_duration_secs = mean(durations.iter().sum(), durations.len());

    let (max_drawdown, max_drawdown_percentage) = drawdown(&closed);

    let long_count = closed
        .iter()
        .filter(|t| t.side == TradeSide::Long)
        .count();
    let short_count = closed.len() - long_count;
    // Unlike profit_factor, a zero denominator here yields the raw long
    // count, not infinity. Both conventions are intentional carry-overs;
    // flagged for product clarification rather than unified.
    let long_short_ratio = if short_count > 0 {
        long_count as f64 / short_count as f64
    } else {
        long_count as f64
    };

    PortfolioMetrics {
        total_pnl,
        total_volume,
        total_fees,
        total_trades: closed.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: win_rate(wins.len(), closed.len()),
        average_win: mean(gross_wins, wins.len()),
        average_loss: mean(gross_losses, losses.len()),
        largest_win,
        largest_loss,
        profit_factor,
        average_duration_secs,
        max_drawdown,
        max_drawdown_percentage,
        long_short_ratio,
    }
}

/// Max peak-to-trough decline of cumulative realized pnl
///
/// Walks closed trades in exit-time order. The percentage is taken against
/// the peak at which the max drawdown was observed; without a positive
/// high-water mark drawdown is undefined and reported as 0.
fn drawdown(closed: &[&Trade]) -> (f64, f64) {
    let mut ordered: Vec<&Trade> = closed.to_vec();
    ordered.sort_by_key(|t| t.exit_time.unwrap_or(t.entry_time));

    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;

    for trade in ordered {
        cumulative += trade.pnl.unwrap_or(0.0);
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = peak - cumulative;
        if dd > max_dd {
            max_dd = dd;
            max_dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        }
    }

    (max_dd, max_dd_pct)
}

/// Closed-trade performance bucketed by hour-of-day in the given timezone
///
/// Always emits all 24 hours, empty buckets included.
pub fn hourly_metrics_in<Tz: TimeZone>(trades: &[Trade], tz: &Tz) -> Vec<HourlyMetrics> {
    let mut pnl = [0.0_f64; 24];
    let mut counts = [0_usize; 24];
    let mut wins = [0_usize; 24];

    for trade in trades.iter().filter(|t| t.is_closed_with_pnl()) {
        let hour = trade.entry_time.with_timezone(tz).hour() as usize;
        let p = trade.pnl.unwrap_or(0.0);
        pnl[hour] += p;
        counts[hour] += 1;
        if p > 0.0 {
            wins[hour] += 1;
        }
    }

    (0..24)
        .map(|h| HourlyMetrics {
            hour: h as u32,
            pnl: pnl[h],
            trade_count: counts[h],
            win_rate: win_rate(wins[h], counts[h]),
        })
        .collect()
}

/// Hourly buckets in the machine's local timezone, matching what a user
/// sees in their own clock
pub fn hourly_metrics(trades: &[Trade]) -> Vec<HourlyMetrics> {
    hourly_metrics_in(trades, &chrono::Local)
}

/// Closed-trade performance bucketed into the three fixed UTC sessions
///
/// Always emits exactly three entries: Asian, European, American.
pub fn session_metrics(trades: &[Trade]) -> Vec<SessionMetrics> {
    struct Acc {
        pnl: f64,
        count: usize,
        wins: usize,
        duration_sum: f64,
        duration_count: usize,
    }

    let mut accs: [Acc; 3] = std::array::from_fn(|_| Acc {
        pnl: 0.0,
        count: 0,
        wins: 0,
        duration_sum: 0.0,
        duration_count: 0,
    });

    for trade in trades.iter().filter(|t| t.is_closed_with_pnl()) {
        let session = TradingSession::from_utc_hour(trade.entry_time.hour());
        let idx = TradingSession::ALL
            .iter()
            .position(|s| *s == session)
            .unwrap_or(0);
        let acc = &mut accs[idx];

        let p = trade.pnl.unwrap_or(0.0);
        acc.pnl += p;
        acc.count += 1;
        if p > 0.0 {
            acc.wins += 1;
        }
        if let Some(d) = trade.duration_secs() {
            acc.duration_sum += d;
            acc.duration_count += 1;
        }
    }

    TradingSession::ALL
        .iter()
        .zip(accs.iter())
        .map(|(session, acc)| SessionMetrics {
            session: *session,
            pnl: acc.pnl,
            trade_count: acc.count,
            win_rate: win_rate(acc.wins, acc.count),
            average_duration_secs: mean(acc.duration_sum, acc.duration_count),
        })
        .collect()
}

/// Per-symbol performance, sorted descending by volume
///
/// Volume and fees accumulate over every trade of the symbol; pnl, count,
/// win rate and average pnl come from the closed subset. The sort is
/// stable, so volume ties keep first-seen input order.
pub fn symbol_metrics(trades: &[Trade]) -> Vec<SymbolMetrics> {
    #[derive(Default)]
    struct Acc {
        pnl: f64,
        volume: f64,
        fees: f64,
        closed: usize,
        wins: usize,
    }

    let mut order: Vec<Symbol> = Vec::new();
    let mut accs: HashMap<Symbol, Acc> = HashMap::new();

    for trade in trades {
        let acc = accs.entry(trade.symbol.clone()).or_insert_with(|| {
            order.push(trade.symbol.clone());
            Acc::default()
        });

        acc.volume += trade.volume();
        acc.fees += trade.fees.total_fee;

        if trade.is_closed_with_pnl() {
            let p = trade.pnl.unwrap_or(0.0);
            acc.pnl += p;
            acc.closed += 1;
            if p > 0.0 {
                acc.wins += 1;
            }
        }
    }

    let mut out: Vec<SymbolMetrics> = order
        .into_iter()
        .map(|symbol| {
            let acc = &accs[&symbol];
            SymbolMetrics {
                symbol,
                pnl: acc.pnl,
                volume: acc.volume,
                fees: acc.fees,
                trade_count: acc.closed,
                win_rate: win_rate(acc.wins, acc.closed),
                average_pnl: mean(acc.pnl, acc.closed),
            }
        })
        .collect();

    out.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    out
}

/// Fee totals plus a per-UTC-day series with a running cumulative
pub fn fee_summary(trades: &[Trade]) -> FeeSummary {
    let mut maker = 0.0;
    let mut taker = 0.0;
    let mut funding = 0.0;
    let mut by_day: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();

    for trade in trades {
        maker += trade.fees.maker_fee;
        taker += trade.fees.taker_fee;
        funding += trade.fees.funding_fee.unwrap_or(0.0);
        *by_day.entry(trade.entry_time.date_naive()).or_insert(0.0) += trade.fees.total_fee;
    }

    let mut cumulative = 0.0;
    let daily = by_day
        .into_iter()
        .map(|(date, fee)| {
            cumulative += fee;
            DailyFee {
                date,
                fee,
                cumulative,
            }
        })
        .collect();

    FeeSummary {
        maker,
        taker,
        funding,
        total: maker + taker + funding,
        daily,
    }
}

/// Closed-trade performance grouped by order kind
pub fn order_type_metrics(trades: &[Trade]) -> Vec<OrderTypeMetrics> {
    #[derive(Default)]
    struct Acc {
        pnl: f64,
        count: usize,
        wins: usize,
        duration_sum: f64,
        duration_count: usize,
    }

    let mut accs: HashMap<OrderKind, Acc> = HashMap::new();

    for trade in trades.iter().filter(|t| t.is_closed_with_pnl()) {
        let acc = accs.entry(trade.order_kind).or_default();
        let p = trade.pnl.unwrap_or(0.0);
        acc.pnl += p;
        acc.count += 1;
        if p > 0.0 {
            acc.wins += 1;
        }
        if let Some(d) = trade.duration_secs() {
            acc.duration_sum += d;
            acc.duration_count += 1;
        }
    }

    [
        OrderKind::Market,
        OrderKind::Limit,
        OrderKind::Stop,
        OrderKind::StopLimit,
    ]
    .into_iter()
    .filter_map(|kind| {
        accs.get(&kind).map(|acc| OrderTypeMetrics {
            order_kind: kind,
            pnl: acc.pnl,
            trade_count: acc.count,
            win_rate: win_rate(acc.wins, acc.count),
            average_duration_secs: mean(acc.duration_sum, acc.duration_count),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeeBreakdown, MarketKind, TradeStatus};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn closed_trade(id: &str, side: TradeSide, entry_price: f64, qty: f64, pnl: f64) -> Trade {
        let entry = base_time();
        Trade {
            id: id.to_string(),
            tx_ref: format!("sig-{}", id),
            symbol: Symbol::new("SOL/USDC"),
            market: MarketKind::Perpetual,
            side,
            order_kind: OrderKind::Market,
            status: TradeStatus::Closed,
            entry_price,
            current_price: None,
            exit_price: Some(entry_price),
            quantity: qty,
            leverage: None,
            entry_time: entry,
            exit_time: Some(entry + Duration::hours(1)),
            pnl: Some(pnl),
            pnl_percentage: None,
            fees: FeeBreakdown::new(0.5, 0.5, None),
            note: None,
            tags: None,
        }
    }

    fn open_trade(id: &str, entry_price: f64, qty: f64) -> Trade {
        let mut t = closed_trade(id, TradeSide::Long, entry_price, qty, 0.0);
        t.status = TradeStatus::Open;
        t.exit_price = None;
        t.exit_time = None;
        t.pnl = None;
        t
    }

    // Scenario A
    #[test]
    fn test_portfolio_metrics_two_trades() {
        let trades = vec![
            closed_trade("1", TradeSide::Long, 100.0, 1.0, 50.0),
            closed_trade("2", TradeSide::Short, 100.0, 1.0, -20.0),
        ];

        let m = portfolio_metrics(&trades);
        assert_eq!(m.total_pnl, 30.0);
        assert_eq!(m.win_rate, 50.0);
        assert_eq!(m.winning_trades, 1);
        assert_eq!(m.losing_trades, 1);
        assert_eq!(m.total_trades, 2);
        assert_eq!(m.profit_factor, 2.5);
        assert_eq!(m.total_volume, 200.0);
        assert_eq!(m.average_win, 50.0);
        assert_eq!(m.average_loss, 20.0);
        assert_eq!(m.largest_win, 50.0);
        assert_eq!(m.largest_loss, 20.0);
    }

    // Scenario B
    #[test]
    fn test_empty_input_yields_zero_metrics() {
        let m = portfolio_metrics(&[]);
        assert_eq!(m.total_pnl, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.long_short_ratio, 0.0);
    }

    // Scenario C
    #[test]
    fn test_zero_pnl_trade_counts_toward_neither() {
        let trades = vec![closed_trade("1", TradeSide::Long, 100.0, 1.0, 0.0)];

        let m = portfolio_metrics(&trades);
        assert_eq!(m.total_trades, 1);
        assert_eq!(m.winning_trades, 0);
        assert_eq!(m.losing_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert!(m.winning_trades + m.losing_trades < m.total_trades);
    }

    // Scenario D
    #[test]
    fn test_drawdown_peak_to_trough() {
        let mut t1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut t2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, 20.0);
        let mut t3 = closed_trade("3", TradeSide::Long, 100.0, 1.0, -25.0);
        t1.exit_time = Some(base_time() + Duration::hours(1));
        t2.exit_time = Some(base_time() + Duration::hours(2));
        t3.exit_time = Some(base_time() + Duration::hours(3));

        // Cumulative walk: 10, 30, 5 — peak 30
        let m = portfolio_metrics(&[t1, t2, t3]);
        assert_eq!(m.max_drawdown, 25.0);
        assert_relative_eq!(m.max_drawdown_percentage, 83.3333, epsilon = 0.01);
    }

    #[test]
    fn test_drawdown_order_independent_of_input() {
        let mut t1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut t2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, 20.0);
        let mut t3 = closed_trade("3", TradeSide::Long, 100.0, 1.0, -25.0);
        t1.exit_time = Some(base_time() + Duration::hours(1));
        t2.exit_time = Some(base_time() + Duration::hours(2));
        t3.exit_time = Some(base_time() + Duration::hours(3));

        // Shuffled input must walk the same exit-time order
        let m = portfolio_metrics(&[t3, t1, t2]);
        assert_eq!(m.max_drawdown, 25.0);
    }

    #[test]
    fn test_drawdown_zero_when_monotone() {
        let mut t1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut t2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, 5.0);
        t1.exit_time = Some(base_time() + Duration::hours(1));
        t2.exit_time = Some(base_time() + Duration::hours(2));

        let m = portfolio_metrics(&[t1, t2]);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.max_drawdown_percentage, 0.0);
    }

    #[test]
    fn test_drawdown_percentage_zero_without_positive_peak() {
        let mut t1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, -10.0);
        let mut t2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, -5.0);
        t1.exit_time = Some(base_time() + Duration::hours(1));
        t2.exit_time = Some(base_time() + Duration::hours(2));

        let m = portfolio_metrics(&[t1, t2]);
        assert_eq!(m.max_drawdown, 15.0);
        assert_eq!(m.max_drawdown_percentage, 0.0);
    }

    #[test]
    fn test_profit_factor_infinity_sentinel() {
        let trades = vec![closed_trade("1", TradeSide::Long, 100.0, 1.0, 40.0)];
        let m = portfolio_metrics(&trades);
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn test_long_short_ratio_falls_back_to_long_count() {
        let trades = vec![
            closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0),
            closed_trade("2", TradeSide::Long, 100.0, 1.0, -5.0),
            closed_trade("3", TradeSide::Long, 100.0, 1.0, 3.0),
        ];
        let m = portfolio_metrics(&trades);
        // No shorts: the ratio is the raw long count, not infinity
        assert_eq!(m.long_short_ratio, 3.0);
    }

    #[test]
    fn test_volume_includes_open_trades() {
        let trades = vec![
            closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0),
            open_trade("2", 50.0, 2.0),
        ];
        let m = portfolio_metrics(&trades);
        assert_eq!(m.total_volume, 200.0);
        assert_eq!(m.total_trades, 1);
        // Fees likewise sum over the full input list
        assert_eq!(m.total_fees, 2.0);
    }

    #[test]
    fn test_hourly_metrics_always_24_buckets() {
        let mut t1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut t2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, -4.0);
        t1.entry_time = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        t2.entry_time = Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap();

        let hours = hourly_metrics_in(&[t1, t2], &Utc);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[9].trade_count, 2);
        assert_eq!(hours[9].pnl, 6.0);
        assert_eq!(hours[9].win_rate, 50.0);

        let total: usize = hours.iter().map(|h| h.trade_count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_session_metrics_exactly_three_entries() {
        let mut asian = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut european = closed_trade("2", TradeSide::Long, 100.0, 1.0, -4.0);
        let mut american = closed_trade("3", TradeSide::Long, 100.0, 1.0, 7.0);
        asian.entry_time = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        european.entry_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        american.entry_time = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();

        let sessions = session_metrics(&[asian, european, american]);
        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[0].session, TradingSession::Asian);
        assert_eq!(sessions[0].pnl, 10.0);
        assert_eq!(sessions[1].session, TradingSession::European);
        assert_eq!(sessions[1].win_rate, 0.0);
        assert_eq!(sessions[2].session, TradingSession::American);

        let total: usize = sessions.iter().map(|s| s.trade_count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_symbol_metrics_sorted_by_volume() {
        let mut small = closed_trade("1", TradeSide::Long, 10.0, 1.0, 5.0);
        small.symbol = Symbol::new("AAA/USDC");
        let mut big = closed_trade("2", TradeSide::Long, 500.0, 1.0, -10.0);
        big.symbol = Symbol::new("BBB/USDC");
        let mut big_open = open_trade("3", 100.0, 1.0);
        big_open.symbol = Symbol::new("BBB/USDC");

        let symbols = symbol_metrics(&[small, big, big_open]);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].symbol.as_str(), "BBB/USDC");
        assert_eq!(symbols[0].volume, 600.0);
        // Closed subset only
        assert_eq!(symbols[0].trade_count, 1);
        assert_eq!(symbols[0].pnl, -10.0);
        assert_eq!(symbols[1].symbol.as_str(), "AAA/USDC");
    }

    #[test]
    fn test_symbol_metrics_ties_keep_input_order() {
        let mut a = closed_trade("1", TradeSide::Long, 100.0, 1.0, 1.0);
        a.symbol = Symbol::new("FIRST/USDC");
        let mut b = closed_trade("2", TradeSide::Long, 100.0, 1.0, 1.0);
        b.symbol = Symbol::new("SECOND/USDC");

        let symbols = symbol_metrics(&[a, b]);
        assert_eq!(symbols[0].symbol.as_str(), "FIRST/USDC");
        assert_eq!(symbols[1].symbol.as_str(), "SECOND/USDC");
    }

    #[test]
    fn test_fee_summary_daily_cumulative() {
        let mut day1 = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        day1.fees = FeeBreakdown::new(1.0, 1.0, Some(0.5));
        let mut day2 = closed_trade("2", TradeSide::Long, 100.0, 1.0, 10.0);
        day2.entry_time = base_time() + Duration::days(1);
        day2.fees = FeeBreakdown::new(2.0, 0.0, None);
        let mut day1_late = open_trade("3", 100.0, 1.0);
        day1_late.fees = FeeBreakdown::new(0.0, 3.0, None);

        // Input is out of day order; the series must come back sorted
        let summary = fee_summary(&[day2.clone(), day1.clone(), day1_late]);
        assert_eq!(summary.maker, 3.0);
        assert_eq!(summary.taker, 4.0);
        assert_eq!(summary.funding, 0.5);
        assert_eq!(summary.total, 7.5);

        assert_eq!(summary.daily.len(), 2);
        assert_eq!(summary.daily[0].date, base_time().date_naive());
        assert_eq!(summary.daily[0].fee, 5.5);
        assert_eq!(summary.daily[0].cumulative, 5.5);
        assert_eq!(summary.daily[1].fee, 2.0);
        assert_eq!(summary.daily[1].cumulative, 7.5);
    }

    #[test]
    fn test_order_type_metrics_groups_closed_trades() {
        let market = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let mut limit_win = closed_trade("2", TradeSide::Long, 100.0, 1.0, 4.0);
        limit_win.order_kind = OrderKind::Limit;
        let mut limit_loss = closed_trade("3", TradeSide::Long, 100.0, 1.0, -2.0);
        limit_loss.order_kind = OrderKind::Limit;

        let kinds = order_type_metrics(&[market, limit_win, limit_loss]);
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].order_kind, OrderKind::Market);
        assert_eq!(kinds[0].trade_count, 1);
        assert_eq!(kinds[1].order_kind, OrderKind::Limit);
        assert_eq!(kinds[1].pnl, 2.0);
        assert_eq!(kinds[1].win_rate, 50.0);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let trades = vec![
            closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0),
            closed_trade("2", TradeSide::Short, 100.0, 1.0, -3.0),
            open_trade("3", 50.0, 1.0),
        ];
        let filter = FilterOptions {
            sides: vec![TradeSide::Long],
            min_pnl: Some(0.0),
            ..Default::default()
        };

        let once = apply_filter(&trades, &filter);
        let twice = apply_filter(&once, &filter);
        assert_eq!(once.len(), twice.len());
        let ids_once: Vec<&str> = once.iter().map(|t| t.id.as_str()).collect();
        let ids_twice: Vec<&str> = twice.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids_once, ids_twice);
    }

    #[test]
    fn test_filter_date_bounds_inclusive() {
        let trade = closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0);
        let filter = FilterOptions {
            date_from: Some(trade.entry_time),
            date_to: Some(trade.entry_time),
            ..Default::default()
        };
        assert_eq!(apply_filter(&[trade], &filter).len(), 1);
    }

    #[test]
    fn test_fees_independent_of_filtering() {
        let trades = vec![
            closed_trade("1", TradeSide::Long, 100.0, 1.0, 10.0),
            closed_trade("2", TradeSide::Short, 100.0, 1.0, -3.0),
        ];
        let summary = fee_summary(&trades);
        let expected: f64 = trades.iter().map(|t| t.fees.total_fee).sum();
        assert_eq!(summary.total, expected);
    }
}
