//! Core of tickstash.
//!
//! This crate contains:
//! - Domain records (`PricePoint`, `NewsArticle`) and validated value types
//! - Round-robin API key rotation and request pacing
//! - The Alpha Vantage client and the two cache-populating fetchers
//! - Cache-first queries with fill-on-miss for prices
//! - The tool registry and its JSON-RPC front end

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod pacing;
pub mod partition;
pub mod provider_policy;
pub mod query;
pub mod rpc;
pub mod service;
pub mod tools;

pub use adapters::{AlphaVantageClient, OutputSize};
pub use config::ServiceConfig;
pub use credentials::{Credential, CredentialSource, KeyRotator};
pub use domain::{
    NewsArticle, NewsTimestamp, NewsWindow, PricePoint, Symbol, TickerSentiment, TopicRelevance,
    TradingDate,
};
pub use error::{FetchError, FetchErrorKind, QueryError, ValidationError};
pub use fetch::{MarketDataFetcher, NewsFetcher, Upstream};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use pacing::RequestPacer;
pub use partition::{price_collection, NEWS_COLLECTION};
pub use provider_policy::ProviderPolicy;
pub use query::{PriceLookup, QueryService};
pub use rpc::RpcHandler;
pub use service::{StoreBackend, TickstashService};
pub use tickstash_warehouse::{
    DocumentStore, Filter, MemoryStore, SortSpec, StoreError, Warehouse, WarehouseConfig,
};
pub use tools::{ToolDescriptor, ToolError, ToolRegistry, ToolResponse};
