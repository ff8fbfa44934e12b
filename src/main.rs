//! Trade analytics - main entry point
//!
//! This binary provides three subcommands:
//! - report: Offline analytics over an exported trade log
//! - snapshot: One reconciliation pass for a wallet
//! - watch: Reconcile and keep marks fresh until interrupted

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "trade-analytics")]
#[command(about = "Trade analytics and position reconciliation for on-chain trading accounts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute metrics over an exported trade log
    Report {
        /// Path to the trade log (.csv or .json)
        #[arg(short, long)]
        trades: String,

        /// Restrict to symbols (comma-separated). E.g., "SOL/USDC,BTC/USDC"
        #[arg(long)]
        symbols: Option<String>,

        /// Restrict to one side (long|short)
        #[arg(long)]
        side: Option<String>,

        /// Restrict to one status (open|closed|liquidated)
        #[arg(long)]
        status: Option<String>,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Minimum realized pnl
        #[arg(long)]
        min_pnl: Option<f64>,

        /// Maximum realized pnl
        #[arg(long)]
        max_pnl: Option<f64>,

        /// Print the hourly breakdown
        #[arg(long)]
        hourly: bool,

        /// Print the session breakdown
        #[arg(long)]
        sessions: bool,

        /// Print the per-symbol breakdown
        #[arg(long)]
        by_symbol: bool,

        /// Print the fee breakdown
        #[arg(long)]
        fees: bool,

        /// Print the order-type breakdown
        #[arg(long)]
        order_types: bool,
    },

    /// One reconciliation pass for a wallet
    Snapshot {
        /// Wallet address
        #[arg(short, long)]
        wallet: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Reconcile and refresh marks until ctrl-c
    Watch {
        /// Wallet address
        #[arg(short, long)]
        wallet: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool) {
    // Filter out noisy HTTP client internals
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Report {
            trades,
            symbols,
            side,
            status,
            from,
            to,
            min_pnl,
            max_pnl,
            hourly,
            sessions,
            by_symbol,
            fees,
            order_types,
        } => commands::report::run(commands::report::ReportArgs {
            trades_path: trades,
            symbols,
            side,
            status,
            from,
            to,
            min_pnl,
            max_pnl,
            breakdowns: commands::report::Breakdowns {
                hourly,
                sessions,
                symbols: by_symbol,
                fees,
                order_types,
            },
        }),
        Commands::Snapshot { wallet, config } => commands::snapshot::run(wallet, config).await,
        Commands::Watch { wallet, config } => commands::watch::run(wallet, config).await,
    }
}
