use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;
use tickstash_warehouse::StoreError;

/// Input validation errors. Raised before any cache or network access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must be YYYYMMDD or YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("timestamp must be YYYYMMDD, YYYYMMDDTHHMM or YYYYMMDDTHHMMSS: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("time window start {from} is after end {to}")]
    InvertedWindow { from: String, to: String },

    #[error("missing required argument '{name}'")]
    MissingArgument { name: &'static str },
    #[error("argument '{name}' is invalid: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

/// Failure class of a fetch-and-store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Credential source missing or empty.
    Configuration,
    /// Transport failure reaching the remote API.
    Network,
    /// Remote API reported an error condition or a non-success status.
    Api,
    /// Response lacks the expected structure.
    Parse,
    /// Cache store unreachable or rejected a write.
    Cache,
}

impl FetchErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Network => "network_error",
            Self::Api => "api_error",
            Self::Parse => "parse_error",
            Self::Cache => "cache_error",
        }
    }
}

impl Display for FetchErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by the key rotator and the fetchers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Configuration, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Api, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Parse, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Cache, message)
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for FetchError {
    fn from(error: StoreError) -> Self {
        Self::cache(error.to_string())
    }
}

/// Failure while reading the cache on behalf of a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("cache read failed: {0}")]
    Store(#[from] StoreError),

    #[error("cached record in '{collection}' could not be decoded: {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}
