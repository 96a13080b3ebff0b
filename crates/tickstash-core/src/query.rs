use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tickstash_warehouse::{DocumentStore, Filter, SortSpec};
use tracing::{debug, info};

use crate::config::DEFAULT_PRICE_HISTORY_LIMIT;
use crate::domain::{NewsArticle, NewsWindow, PricePoint, Symbol, TradingDate};
use crate::fetch::MarketDataFetcher;
use crate::partition::{price_collection, NEWS_COLLECTION};
use crate::{FetchError, FetchErrorKind, QueryError};

/// Outcome of a price query. Fetch failures are data here, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceLookup {
    /// Served from the cache without an upstream call.
    Cached(Vec<PricePoint>),
    /// Served from the cache right after filling it.
    Fetched(Vec<PricePoint>),
    /// Still nothing after a fetch; `detail` explains why when known.
    NotFound { detail: Option<String> },
    /// The fill attempt failed.
    FetchFailed(FetchError),
}

impl PriceLookup {
    pub fn records(&self) -> &[PricePoint] {
        match self {
            Self::Cached(records) | Self::Fetched(records) => records,
            Self::NotFound { .. } | Self::FetchFailed(_) => &[],
        }
    }
}

type InFlight = Arc<tokio::sync::Mutex<()>>;

/// Cache-first reads with fill-on-miss for prices.
///
/// Concurrent misses for the same symbol wait on one per-symbol lock, so only
/// the first caller reaches upstream; the others re-read the filled cache.
pub struct QueryService {
    store: Arc<dyn DocumentStore>,
    fetcher: MarketDataFetcher,
    price_history_limit: usize,
    in_flight: Mutex<HashMap<Symbol, InFlight>>,
}

impl QueryService {
    pub fn new(store: Arc<dyn DocumentStore>, fetcher: MarketDataFetcher) -> Self {
        Self {
            store,
            fetcher,
            price_history_limit: DEFAULT_PRICE_HISTORY_LIMIT,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_price_history_limit(mut self, limit: usize) -> Self {
        self.price_history_limit = limit.max(1);
        self
    }

    /// Records for `date`, or the latest records newest first when `date` is `None`.
    pub async fn get_prices(
        &self,
        symbol: &Symbol,
        date: Option<TradingDate>,
    ) -> Result<PriceLookup, QueryError> {
        let cached = self.read_prices(symbol, date)?;
        if !cached.is_empty() {
            debug!(%symbol, records = cached.len(), "price cache hit");
            return Ok(PriceLookup::Cached(cached));
        }

        let slot = self.claim_in_flight(symbol);
        let _filling = slot.gate.lock().await;
        self.fill_and_read(symbol, date).await
    }

    async fn fill_and_read(
        &self,
        symbol: &Symbol,
        date: Option<TradingDate>,
    ) -> Result<PriceLookup, QueryError> {
        let filled_meanwhile = self.read_prices(symbol, date)?;
        if !filled_meanwhile.is_empty() {
            debug!(%symbol, "price cache filled by a concurrent query");
            return Ok(PriceLookup::Cached(filled_meanwhile));
        }

        info!(%symbol, date = ?date.map(TradingDate::canonical), "price cache miss, fetching");
        match self.fetcher.fetch_and_store(symbol).await {
            Ok(_) => {}
            Err(error) if error.kind() == FetchErrorKind::Parse => {
                return Ok(PriceLookup::NotFound {
                    detail: Some(error.to_string()),
                });
            }
            Err(error) => return Ok(PriceLookup::FetchFailed(error)),
        }

        let fetched = self.read_prices(symbol, date)?;
        if fetched.is_empty() {
            Ok(PriceLookup::NotFound { detail: None })
        } else {
            Ok(PriceLookup::Fetched(fetched))
        }
    }

    /// Articles published inside `window`, newest first. Never fetches.
    ///
    /// A non-blank `keyword` keeps articles whose title or summary contains it,
    /// ignoring case.
    pub fn get_news(
        &self,
        window: &NewsWindow,
        keyword: Option<&str>,
    ) -> Result<Vec<NewsArticle>, QueryError> {
        let mut filters = vec![Filter::between(
            "time_published",
            window.from().canonical(),
            window.to().canonical(),
        )];
        if let Some(keyword) = keyword.map(str::trim).filter(|keyword| !keyword.is_empty()) {
            filters.push(Filter::contains_text(&["title", "summary"], keyword));
        }

        let documents = self.store.read(
            NEWS_COLLECTION,
            &Filter::and(filters),
            Some(&SortSpec::descending("time_published")),
            None,
        )?;
        decode_all(NEWS_COLLECTION, documents)
    }

    fn read_prices(
        &self,
        symbol: &Symbol,
        date: Option<TradingDate>,
    ) -> Result<Vec<PricePoint>, QueryError> {
        let collection = price_collection(symbol);
        let documents = match date {
            Some(date) => self.store.read(
                &collection,
                &Filter::eq("date", date.canonical()),
                None,
                Some(1),
            )?,
            None => self.store.read(
                &collection,
                &Filter::All,
                Some(&SortSpec::descending("date")),
                Some(self.price_history_limit),
            )?,
        };
        decode_all(&collection, documents)
    }

    fn claim_in_flight(&self, symbol: &Symbol) -> InFlightSlot<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(in_flight.entry(symbol.clone()).or_default());
        InFlightSlot {
            owner: &self.in_flight,
            symbol: symbol.clone(),
            gate,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One caller's claim on a symbol's gate; dropping it (even mid-await) releases the entry.
struct InFlightSlot<'a> {
    owner: &'a Mutex<HashMap<Symbol, InFlight>>,
    symbol: Symbol,
    gate: InFlight,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        // map entry plus ours means nobody else is waiting
        if Arc::strong_count(&self.gate) <= 2 {
            in_flight.remove(&self.symbol);
        }
    }
}

fn decode_all<T: DeserializeOwned>(
    collection: &str,
    documents: Vec<Value>,
) -> Result<Vec<T>, QueryError> {
    documents
        .into_iter()
        .map(|document| {
            serde_json::from_value(document).map_err(|source| QueryError::Decode {
                collection: collection.to_owned(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AlphaVantageClient;
    use crate::credentials::KeyRotator;
    use crate::fetch::Upstream;
    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
    use crate::pacing::RequestPacer;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use tickstash_warehouse::MemoryStore;

    /// Fails every call after `latency`; `None` never answers at all.
    struct OfflineHttpClient {
        latency: Option<Duration>,
    }

    impl HttpClient for OfflineHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            Box::pin(async move {
                match self.latency {
                    Some(latency) => tokio::time::sleep(latency).await,
                    None => std::future::pending::<()>().await,
                }
                Err(HttpError::new("offline"))
            })
        }
    }

    fn service(store: Arc<MemoryStore>) -> QueryService {
        service_with_latency(store, Some(Duration::ZERO))
    }

    fn service_with_latency(store: Arc<MemoryStore>, latency: Option<Duration>) -> QueryService {
        let client = AlphaVantageClient::new(
            Arc::new(OfflineHttpClient { latency }),
            "https://example.test/query",
            Duration::from_secs(1),
        );
        let upstream = Upstream::new(
            client,
            Arc::new(KeyRotator::from_keys(["K1"])),
            RequestPacer::disabled(),
        );
        QueryService::new(store.clone(), MarketDataFetcher::new(upstream, store))
    }

    #[tokio::test]
    async fn transport_failures_become_fetch_failed_and_release_the_gate() {
        let service = service(Arc::new(MemoryStore::new()));
        let symbol = Symbol::parse("IBM").expect("symbol");

        let lookup = service.get_prices(&symbol, None).await.expect("lookup");

        match lookup {
            PriceLookup::FetchFailed(error) => assert_eq!(error.kind(), FetchErrorKind::Network),
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        assert_eq!(service.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_misses_share_one_gate_and_leave_no_entry() {
        let service = service_with_latency(
            Arc::new(MemoryStore::new()),
            Some(Duration::from_millis(50)),
        );
        let symbol = Symbol::parse("IBM").expect("symbol");

        let (first, second) = tokio::join!(
            service.get_prices(&symbol, None),
            service.get_prices(&symbol, None)
        );

        assert!(matches!(first.expect("first"), PriceLookup::FetchFailed(_)));
        assert!(matches!(second.expect("second"), PriceLookup::FetchFailed(_)));
        assert_eq!(service.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fill_releases_the_gate() {
        let service = service_with_latency(Arc::new(MemoryStore::new()), None);
        let symbol = Symbol::parse("IBM").expect("symbol");

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), service.get_prices(&symbol, None)).await;

        assert!(abandoned.is_err());
        assert_eq!(service.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn undecodable_cached_records_surface_as_query_errors() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert("stock-IBM", &Filter::eq("date", "2025-01-02"), json!({ "date": "2025-01-02" }))
            .expect("seed");
        let service = service(store);

        let error = service
            .get_prices(&Symbol::parse("IBM").expect("symbol"), None)
            .await
            .expect_err("decode error");
        assert!(matches!(error, QueryError::Decode { .. }));
    }
}
