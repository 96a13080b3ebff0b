use std::sync::Arc;

use tickstash_warehouse::{DocumentStore, Filter};
use tracing::{info, warn};

use super::{upsert_record, Upstream};
use crate::adapters::OutputSize;
use crate::credentials::Credential;
use crate::domain::Symbol;
use crate::partition::price_collection;
use crate::FetchError;

/// Daily price fetcher writing into `stock-{SYMBOL}` keyed by trading date.
#[derive(Clone)]
pub struct MarketDataFetcher {
    upstream: Upstream,
    store: Arc<dyn DocumentStore>,
    output_size: OutputSize,
}

impl MarketDataFetcher {
    pub fn new(upstream: Upstream, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            upstream,
            store,
            output_size: OutputSize::Compact,
        }
    }

    pub fn with_output_size(mut self, output_size: OutputSize) -> Self {
        self.output_size = output_size;
        self
    }

    /// Fetch the daily series for `symbol` and upsert every entry.
    ///
    /// Returns the number of upserted records; an empty series is `Ok(0)`.
    /// Records upserted before a failure stay in the cache.
    pub async fn fetch_and_store(&self, symbol: &Symbol) -> Result<usize, FetchError> {
        let credential = self.upstream.rotator.next_credential()?;

        self.upstream.pacer.admit().await;
        let outcome = self.pull(symbol, &credential).await;
        self.upstream.pacer.pace().await;

        match &outcome {
            Ok(upserted) => info!(%symbol, upserted, "stored daily prices"),
            Err(error) => warn!(%symbol, %error, "daily price fetch failed"),
        }
        outcome
    }

    async fn pull(&self, symbol: &Symbol, credential: &Credential) -> Result<usize, FetchError> {
        let points = self
            .upstream
            .client
            .daily_series(symbol, self.output_size, credential)
            .await?;

        let collection = price_collection(symbol);
        let mut upserted = 0;
        for point in &points {
            let key = Filter::eq("date", point.date.canonical());
            upsert_record(self.store.as_ref(), &collection, key, point)?;
            upserted += 1;
        }
        Ok(upserted)
    }
}
