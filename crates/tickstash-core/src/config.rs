use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::adapters::alphavantage::OutputSize;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_NAMESPACE: &str = "finance";
pub const DEFAULT_PACING_MS: u64 = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PRICE_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_NEWS_FETCH_LIMIT: usize = 1_000;

/// Runtime settings for a tickstash service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Root directory for tickstash data.
    pub home: PathBuf,
    /// Line-delimited API key file.
    pub keys_file: PathBuf,
    /// Path to the `DuckDB` cache file.
    pub db_path: PathBuf,
    /// Logical database namespace holding all collections.
    pub namespace: String,
    pub base_url: String,
    /// Fixed pause after every remote call.
    pub pacing_delay: Duration,
    pub request_timeout: Duration,
    /// Records returned by an undated price query.
    pub price_history_limit: usize,
    /// `limit` sent with news requests.
    pub news_fetch_limit: usize,
    pub output_size: OutputSize,
}

impl ServiceConfig {
    /// Defaults rooted at `home`, ignoring the environment.
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            keys_file: home.join("api_keys.txt"),
            db_path: home.join("cache").join("finance.duckdb"),
            home,
            namespace: String::from(DEFAULT_NAMESPACE),
            base_url: String::from(DEFAULT_BASE_URL),
            pacing_delay: Duration::from_millis(DEFAULT_PACING_MS),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            price_history_limit: DEFAULT_PRICE_HISTORY_LIMIT,
            news_fetch_limit: DEFAULT_NEWS_FETCH_LIMIT,
            output_size: OutputSize::Compact,
        }
    }

    /// Read `TICKSTASH_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(None, |name| env::var(name).ok())
    }

    /// Resolve settings from `lookup`, with `home_override` taking precedence
    /// over `TICKSTASH_HOME`.
    pub fn resolve(
        home_override: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let home = home_override
            .map(Path::to_path_buf)
            .or_else(|| non_empty("TICKSTASH_HOME").map(PathBuf::from))
            .unwrap_or_else(default_home);
        let mut config = Self::for_home(home);

        if let Some(path) = non_empty("TICKSTASH_KEYS_FILE") {
            config.keys_file = PathBuf::from(path);
        }
        if let Some(path) = non_empty("TICKSTASH_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(url) = non_empty("TICKSTASH_ALPHAVANTAGE_URL") {
            config.base_url = url.trim().to_owned();
        }
        if let Some(ms) = parse_var(&non_empty, "TICKSTASH_PACING_MS") {
            config.pacing_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&non_empty, "TICKSTASH_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = non_empty("TICKSTASH_OUTPUTSIZE") {
            match OutputSize::parse(&raw) {
                Some(size) => config.output_size = size,
                None => warn!(
                    value = %raw,
                    "ignoring TICKSTASH_OUTPUTSIZE, expected compact or full"
                ),
            }
        }

        config
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

fn default_home() -> PathBuf {
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickstash");
    }

    PathBuf::from(".tickstash")
}
