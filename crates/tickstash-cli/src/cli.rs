//! CLI argument definitions for tickstash.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` | Run the stdio JSON-RPC server |
//! | `tools` | Print the tool catalog |
//! | `prices` | Daily prices for a symbol, fetched on a cache miss |
//! | `news` | Cached news articles in a time window |
//! | `fetch` | Run a fetcher directly and report upserted records |
//! | `cache` | Inspect the local cache |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--home` | `$HOME/.tickstash` | Data directory |
//! | `--keys-file` | `{home}/api_keys.txt` | API key file |
//! | `--db-path` | `{home}/cache/finance.duckdb` | `DuckDB` cache file |
//! | `--store` | `duckdb` | Cache backend |
//! | `--pace-ms` | `5000` | Pause after every remote call |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Prices for one trading day
//! tickstash prices AAPL --date 20251223 --pretty
//!
//! # News mentioning a keyword
//! tickstash news --from 20251220 --to 20251223 --keyword trading
//!
//! # Serve tools to an RPC client
//! tickstash serve
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tickstash_core::StoreBackend;

/// Alpha Vantage prices and news behind a local document cache.
#[derive(Debug, Parser)]
#[command(
    name = "tickstash",
    author,
    version,
    about = "Alpha Vantage prices and news behind a local document cache"
)]
pub struct Cli {
    /// Data directory holding the key file and the cache.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Line-delimited Alpha Vantage API key file.
    #[arg(long, global = true)]
    pub keys_file: Option<PathBuf>,

    /// `DuckDB` cache file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Cache backend.
    #[arg(long, global = true, value_enum, default_value_t = StoreKind::Duckdb)]
    pub store: StoreKind,

    /// Pause after every remote call, in milliseconds.
    #[arg(long, global = true)]
    pub pace_ms: Option<u64>,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Duckdb,
    Memory,
}

impl From<StoreKind> for StoreBackend {
    fn from(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Duckdb => Self::DuckDb,
            StoreKind::Memory => Self::Memory,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the tools as newline-delimited JSON-RPC on stdin/stdout.
    Serve,
    /// Print the tool catalog.
    Tools,
    /// Run get_stock_prices.
    Prices(PricesArgs),
    /// Run get_news.
    News(NewsArgs),
    /// Run a fetcher directly.
    #[command(subcommand)]
    Fetch(FetchCommand),
    /// Inspect the local cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Args)]
pub struct PricesArgs {
    /// Ticker symbol, e.g. AAPL.
    pub symbol: String,

    /// Trading date as YYYYMMDD.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Args)]
pub struct WindowArgs {
    /// Window start: YYYYMMDD, YYYYMMDDTHHMM or YYYYMMDDTHHMMSS.
    #[arg(long)]
    pub from: String,

    /// Window end; a bare date covers the whole day.
    #[arg(long)]
    pub to: String,
}

#[derive(Debug, Args)]
pub struct NewsArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Case-insensitive text to look for in title or summary.
    #[arg(long)]
    pub keyword: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum FetchCommand {
    /// Fetch and store the daily series for a symbol.
    Prices {
        /// Ticker symbol, e.g. IBM.
        symbol: String,
    },
    /// Fetch and store news articles published in a window.
    News(WindowArgs),
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Record counts per collection.
    Stats,
}
