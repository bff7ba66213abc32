//! Breakout analyzer - main entry point
//!
//! This binary provides three subcommands:
//! - analyze: Find breakouts for one ticker and report their holding returns
//! - scan: Analyze many tickers in parallel and rank them
//! - download: Store daily bars from Yahoo Finance as CSV files

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "breakout-analyzer")]
#[command(about = "Volume and price breakout detection with forward-return analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply if it does not exist)
    #[arg(short, long, global = true, default_value = "configs/default.json")]
    config: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze breakouts for a single ticker
    Analyze {
        /// Ticker symbol, e.g. AAPL
        #[arg(short, long)]
        ticker: String,

        /// Start date (YYYY-MM-DD), defaults to end minus the configured lookback
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Volume breakout threshold in percent over the 20-day average
        #[arg(long)]
        volume_threshold: Option<f64>,

        /// Daily price change threshold in percent
        #[arg(long, allow_hyphen_values = true)]
        price_threshold: Option<f64>,

        /// Holding period in trading days
        #[arg(long)]
        holding_period: Option<usize>,

        /// Data source: "yahoo" or "csv" (overrides config)
        #[arg(long)]
        source: Option<String>,

        /// Write results to this CSV file
        #[arg(short, long)]
        output: Option<String>,

        /// Write results to {results_dir}/{TICKER}_breakout_analysis.csv
        #[arg(long)]
        export: bool,
    },

    /// Analyze several tickers in parallel
    Scan {
        /// Tickers to scan (comma-separated). E.g., "AAPL,MSFT,NVDA"
        #[arg(short, long)]
        tickers: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Volume breakout threshold in percent over the 20-day average
        #[arg(long)]
        volume_threshold: Option<f64>,

        /// Daily price change threshold in percent
        #[arg(long, allow_hyphen_values = true)]
        price_threshold: Option<f64>,

        /// Holding period in trading days
        #[arg(long)]
        holding_period: Option<usize>,

        /// Data source: "yahoo" or "csv" (overrides config)
        #[arg(long)]
        source: Option<String>,

        /// Sort results by metric (count, avg_return, win_rate)
        #[arg(long, default_value = "avg_return")]
        sort_by: String,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Download daily bars from Yahoo Finance
    Download {
        /// Tickers to download (comma-separated). E.g., "AAPL,MSFT"
        #[arg(short, long)]
        tickers: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Output directory (overrides config data_dir)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Analyze { .. } => ("analyze", false),
        Commands::Scan { .. } => ("scan", true),
        Commands::Download { .. } => ("download", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Analyze {
            ticker,
            start,
            end,
            volume_threshold,
            price_threshold,
            holding_period,
            source,
            output,
            export,
        } => commands::analyze::run(
            cli.config,
            ticker,
            commands::RunOverrides {
                start,
                end,
                volume_threshold,
                price_threshold,
                holding_period,
                source,
            },
            output,
            export,
        ),

        Commands::Scan {
            tickers,
            start,
            end,
            volume_threshold,
            price_threshold,
            holding_period,
            source,
            sort_by,
            sequential,
        } => commands::scan::run(
            cli.config,
            tickers,
            commands::RunOverrides {
                start,
                end,
                volume_threshold,
                price_threshold,
                holding_period,
                source,
            },
            sort_by,
            sequential,
        ),

        Commands::Download {
            tickers,
            start,
            end,
            output,
        } => commands::download::run(cli.config, tickers, start, end, output),
    }
}
