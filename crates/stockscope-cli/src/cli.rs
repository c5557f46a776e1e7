//! CLI argument definitions for stockscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Quote, indicators and a BUY/SELL/HOLD recommendation |
//! | `quote` | Latest quote with the provider chain that produced it |
//! | `history` | Daily closing prices |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Never touch the network; simulated data only |
//! | `--seed` | none | Seed for reproducible simulated data |
//! | `--timeout-ms` | from env, else `8000` | Per-provider timeout |
//! | `--no-cache` | `false` | Bypass the response cache |
//!
//! # Examples
//!
//! ```bash
//! stockscope analyze AAPL --pretty
//! stockscope quote MSFT --format table
//! stockscope history NVDA --days 90 --offline --seed 7
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stock quotes, technical indicators and heuristic recommendations.
#[derive(Debug, Parser)]
#[command(
    name = "stockscope",
    author,
    version,
    about = "Stock quotes, indicators and recommendations",
    long_about = "stockscope fetches a quote from the first responsive provider \
(Twelve Data, Alpha Vantage, Yahoo Finance, Finnhub), derives RSI, trend and \
support/resistance from recent daily closes, and scores a BUY/SELL/HOLD \
recommendation.\n\
\n\
When every provider fails the answer is simulated and labelled as such.\n\
\n\
Use 'stockscope <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Skip all upstream providers and answer with simulated data.
    ///
    /// Without this flag the demo keys and keyless Yahoo still hit the network.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Seed for the simulated data generator.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Per-provider timeout in milliseconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Do not cache provider responses.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object.
    Json,
    /// Aligned key/value lines for terminal display.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full analysis: quote, indicators, recommendation and history.
    ///
    /// # Examples
    ///
    ///   stockscope analyze AAPL
    ///   stockscope analyze tsla --format table
    Analyze(SymbolArgs),

    /// Latest quote only.
    ///
    /// # Examples
    ///
    ///   stockscope quote GOOGL --pretty
    Quote(SymbolArgs),

    /// Daily closing prices, oldest first.
    ///
    /// # Examples
    ///
    ///   stockscope history AAPL
    ///   stockscope history AAPL --days 60
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct SymbolArgs {
    /// Ticker symbol, 1-5 letters (e.g., AAPL).
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Ticker symbol, 1-5 letters (e.g., AAPL).
    pub symbol: String,

    /// Number of daily points (defaults to STOCKSCOPE_HISTORY_DAYS, else 30).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3650))]
    pub days: Option<u64>,
}
