//! Report command implementation
//!
//! Offline analytics over an exported trade log: filter, compute portfolio
//! metrics, and print the requested breakdowns.

use anyhow::{bail, Result};
use itertools::Itertools;
use tracing::info;

use trade_analytics::analytics;
use trade_analytics::data;
use trade_analytics::{FilterOptions, Symbol, TradeSide, TradeStatus};

/// Flags for the optional breakdown sections
#[derive(Debug, Clone, Copy, Default)]
pub struct Breakdowns {
    pub hourly: bool,
    pub sessions: bool,
    pub symbols: bool,
    pub fees: bool,
    pub order_types: bool,
}

pub struct ReportArgs {
    pub trades_path: String,
    pub symbols: Option<String>,
    pub side: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub min_pnl: Option<f64>,
    pub max_pnl: Option<f64>,
    pub breakdowns: Breakdowns,
}

fn parse_side(s: &str) -> Result<TradeSide> {
    match s {
        "long" => Ok(TradeSide::Long),
        "short" => Ok(TradeSide::Short),
        other => bail!("Unknown side: {} (expected long|short)", other),
    }
}

fn parse_status(s: &str) -> Result<TradeStatus> {
    match s {
        "open" => Ok(TradeStatus::Open),
        "closed" => Ok(TradeStatus::Closed),
        "liquidated" => Ok(TradeStatus::Liquidated),
        other => bail!("Unknown status: {} (expected open|closed|liquidated)", other),
    }
}

fn parse_date(s: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(chrono::DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0).unwrap_or_default(),
        chrono::Utc,
    ))
}

fn build_filter(args: &ReportArgs) -> Result<FilterOptions> {
    let mut filter = FilterOptions::default();

    if let Some(symbols) = &args.symbols {
        filter.symbols = symbols.split(',').map(Symbol::new).collect();
    }
    if let Some(side) = &args.side {
        filter.sides = vec![parse_side(side)?];
    }
    if let Some(status) = &args.status {
        filter.statuses = vec![parse_status(status)?];
    }
    if let Some(from) = &args.from {
        filter.date_from = Some(parse_date(from)?);
    }
    if let Some(to) = &args.to {
        // Inclusive end of day
        filter.date_to = Some(parse_date(to)? + chrono::Duration::days(1) - chrono::Duration::seconds(1));
    }
    filter.min_pnl = args.min_pnl;
    filter.max_pnl = args.max_pnl;

    Ok(filter)
}

pub fn run(args: ReportArgs) -> Result<()> {
    info!("Loading trade log from: {}", args.trades_path);
    let trades = data::load_trades(&args.trades_path)?;

    let filter = build_filter(&args)?;
    let filtered = analytics::apply_filter(&trades, &filter);
    info!("{} of {} trades pass the filter", filtered.len(), trades.len());

    let metrics = analytics::portfolio_metrics(&filtered);

    println!("\n=== Portfolio ===");
    println!("Closed trades:     {}", metrics.total_trades);
    println!(
        "Wins / losses:     {} / {}",
        metrics.winning_trades, metrics.losing_trades
    );
    println!("Win rate:          {:.2}%", metrics.win_rate);
    println!("Total PnL:         {:.4}", metrics.total_pnl);
    println!("Total volume:      {:.4}", metrics.total_volume);
    println!("Total fees:        {:.4}", metrics.total_fees);
    if metrics.profit_factor.is_infinite() {
        println!("Profit factor:     inf");
    } else {
        println!("Profit factor:     {:.2}", metrics.profit_factor);
    }
    println!(
        "Avg win / loss:    {:.4} / {:.4}",
        metrics.average_win, metrics.average_loss
    );
    println!(
        "Largest win/loss:  {:.4} / {:.4}",
        metrics.largest_win, metrics.largest_loss
    );
    println!(
        "Max drawdown:      {:.4} ({:.2}%)",
        metrics.max_drawdown, metrics.max_drawdown_percentage
    );
    println!("Long/short ratio:  {:.2}", metrics.long_short_ratio);
    println!(
        "Avg duration:      {:.0}s",
        metrics.average_duration_secs
    );

    if args.breakdowns.hourly {
        println!("\n=== By hour (local) ===");
        for hour in analytics::hourly_metrics(&filtered) {
            if hour.trade_count > 0 {
                println!(
                    "{:02}:00  pnl {:>10.4}  trades {:>3}  win rate {:>6.2}%",
                    hour.hour, hour.pnl, hour.trade_count, hour.win_rate
                );
            }
        }
    }

    if args.breakdowns.sessions {
        println!("\n=== By session (UTC) ===");
        for session in analytics::session_metrics(&filtered) {
            println!(
                "{:<9}  pnl {:>10.4}  trades {:>3}  win rate {:>6.2}%  avg hold {:.0}s",
                session.session.to_string(),
                session.pnl,
                session.trade_count,
                session.win_rate,
                session.average_duration_secs
            );
        }
    }

    if args.breakdowns.symbols {
        println!("\n=== By symbol ===");
        for symbol in analytics::symbol_metrics(&filtered) {
            println!(
                "{:<12}  volume {:>12.4}  pnl {:>10.4}  trades {:>3}  win rate {:>6.2}%",
                symbol.symbol.to_string(),
                symbol.volume,
                symbol.pnl,
                symbol.trade_count,
                symbol.win_rate
            );
        }
    }

    if args.breakdowns.fees {
        let summary = analytics::fee_summary(&filtered);
        println!("\n=== Fees ===");
        println!(
            "maker {:.4}  taker {:.4}  funding {:.4}  total {:.4}",
            summary.maker, summary.taker, summary.funding, summary.total
        );
        for day in &summary.daily {
            println!(
                "{}  fee {:>10.4}  cumulative {:>10.4}",
                day.date, day.fee, day.cumulative
            );
        }
    }

    if args.breakdowns.order_types {
        println!("\n=== By order type ===");
        for kind in analytics::order_type_metrics(&filtered) {
            println!(
                "{:<11}  pnl {:>10.4}  trades {:>3}  win rate {:>6.2}%",
                kind.order_kind.to_string(),
                kind.pnl,
                kind.trade_count,
                kind.win_rate
            );
        }
    }

    if !filter.symbols.is_empty() {
        info!(
            "Report restricted to: {}",
            filter.symbols.iter().map(|s| s.as_str()).join(", ")
        );
    }

    Ok(())
}
