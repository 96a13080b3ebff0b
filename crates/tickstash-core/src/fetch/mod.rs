//! Pull records from Alpha Vantage and upsert them into the cache.
//!
//! Both fetchers follow one sequence per call:
//!
//! 1. draw a key from the shared [`KeyRotator`] (no key, no call, no pause);
//! 2. wait for [`RequestPacer::admit`];
//! 3. request, decode and upsert record by record;
//! 4. [`RequestPacer::pace`] once, whatever step 3 returned.
//!
//! Errors propagate untouched; converting them into tool responses is the
//! query layer's job.

mod news;
mod prices;

use std::sync::Arc;

use serde::Serialize;
use tickstash_warehouse::{DocumentStore, Filter};

pub use news::NewsFetcher;
pub use prices::MarketDataFetcher;

use crate::adapters::AlphaVantageClient;
use crate::credentials::KeyRotator;
use crate::pacing::RequestPacer;
use crate::FetchError;

/// Provider access shared by every fetcher of a service.
#[derive(Clone)]
pub struct Upstream {
    pub client: AlphaVantageClient,
    pub rotator: Arc<KeyRotator>,
    pub pacer: RequestPacer,
}

impl Upstream {
    pub fn new(client: AlphaVantageClient, rotator: Arc<KeyRotator>, pacer: RequestPacer) -> Self {
        Self {
            client,
            rotator,
            pacer,
        }
    }
}

fn upsert_record<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    key: Filter,
    record: &T,
) -> Result<(), FetchError> {
    let document = serde_json::to_value(record).map_err(|e| {
        FetchError::cache(format!("record for '{collection}' could not be encoded: {e}"))
    })?;
    store.upsert(collection, &key, document)?;
    Ok(())
}
