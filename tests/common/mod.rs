//! Shared doubles and fixtures for the behavior tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tickstash_core::{
    DocumentStore, Filter, HttpClient, HttpError, HttpRequest, HttpResponse, KeyRotator,
    MemoryStore, RequestPacer, ServiceConfig, SortSpec, StoreError, TickstashService,
};

pub const BASE_URL: &str = "https://alphavantage.test/query";

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync>;

/// HTTP double that records every request and answers from a script.
pub struct ScriptedHttpClient {
    queued: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    fallback: Responder,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl ScriptedHttpClient {
    /// Answer every request with `responder`.
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        })
    }

    /// Answer every request with the same 200 body.
    pub fn always(body: impl Into<String>) -> Arc<Self> {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::ok_json(body.clone())))
    }

    /// Like [`ScriptedHttpClient::always`], but every answer suspends for `latency` first.
    pub fn delayed(body: impl Into<String>, latency: Duration) -> Arc<Self> {
        let body = body.into();
        Arc::new(Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Box::new(move |_| Ok(HttpResponse::ok_json(body.clone()))),
            requests: Mutex::new(Vec::new()),
            latency,
        })
    }

    /// Answer requests in order from `responses`, then with an empty object.
    pub fn sequence(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        let client = Self::always("{}");
        client
            .queued
            .lock()
            .expect("queue lock")
            .extend(responses);
        client
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request log lock").len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let queued = self.queued.lock().expect("queue lock").pop_front();
            let response = match queued {
                Some(response) => response,
                None => (self.fallback)(&request),
            };
            self.requests.lock().expect("request log lock").push(request);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            response
        })
    }
}

/// Store double that reads from memory but refuses every write.
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl DocumentStore for ReadOnlyStore {
    fn read(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.read(collection, filter, sort, limit)
    }

    fn upsert(
        &self,
        _collection: &str,
        _filter: &Filter,
        _record: Value,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Rejected(String::from("store is read only")))
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        self.inner.collections()
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::for_home("/nonexistent/tickstash-home");
    config.base_url = String::from(BASE_URL);
    config
}

/// Service over `store` and `http` with the given inline keys and no pacing.
pub fn service_with_store(
    store: Arc<dyn DocumentStore>,
    http: Arc<ScriptedHttpClient>,
    keys: &[&str],
) -> TickstashService {
    TickstashService::assemble(
        test_config(),
        store,
        http,
        KeyRotator::from_keys(keys.iter().copied()),
        RequestPacer::disabled(),
    )
}

/// Memory-backed service plus a handle on its store.
pub fn memory_service(
    http: Arc<ScriptedHttpClient>,
    keys: &[&str],
) -> (TickstashService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = service_with_store(store.clone(), http, keys);
    (service, store)
}

pub fn aapl_payload() -> String {
    json!({
        "Meta Data": {
            "1. Information": "Daily Prices (open, high, low, close) and Volumes",
            "2. Symbol": "AAPL"
        },
        "Time Series (Daily)": {
            "2025-12-23": {
                "1. open": "270.97",
                "2. high": "272.45",
                "3. low": "269.56",
                "4. close": "272.36",
                "5. volume": "29360026"
            }
        }
    })
    .to_string()
}

pub fn ibm_payload() -> String {
    json!({
        "Time Series (Daily)": {
            "2025-12-19": {
                "1. open": "291.10", "2. high": "293.00", "3. low": "289.75",
                "4. close": "292.31", "5. volume": "4120934"
            },
            "2025-12-22": {
                "1. open": "292.40", "2. high": "295.12", "3. low": "291.80",
                "4. close": "294.65", "5. volume": "3561877"
            },
            "2025-12-23": {
                "1. open": "294.70", "2. high": "296.03", "3. low": "293.22",
                "4. close": "295.48", "5. volume": "3317120"
            }
        }
    })
    .to_string()
}

pub fn news_payload() -> String {
    json!({
        "items": "3",
        "feed": [
            {
                "title": "Chipmakers rally as AI demand holds",
                "url": "https://news.test/chips",
                "time_published": "20251222T143000",
                "authors": ["A. Writer"],
                "summary": "Semiconductor shares extended gains in heavy Trading volume.",
                "banner_image": "https://news.test/chips.png",
                "source": "Wire",
                "category_within_source": "Markets",
                "source_domain": "news.test",
                "topics": [{ "topic": "Technology", "relevance_score": "0.91" }],
                "overall_sentiment_score": 0.31,
                "overall_sentiment_label": "Somewhat-Bullish",
                "ticker_sentiment": [{
                    "ticker": "NVDA",
                    "relevance_score": "0.77",
                    "ticker_sentiment_score": "0.42",
                    "ticker_sentiment_label": "Bullish"
                }]
            },
            {
                "title": "Options trading desks brace for holiday lull",
                "url": "https://news.test/options",
                "time_published": "20251223T0915",
                "summary": "Volumes expected to thin out.",
                "overall_sentiment_score": "-0.05",
                "overall_sentiment_label": "Neutral"
            },
            {
                "title": "Central bank holds rates",
                "url": "https://news.test/rates",
                "time_published": "20251220T180000",
                "authors": [],
                "summary": "Policy unchanged for a third meeting.",
                "banner_image": null,
                "source": "Wire",
                "category_within_source": "Economy",
                "source_domain": "news.test",
                "topics": [],
                "overall_sentiment_score": "0.02",
                "overall_sentiment_label": "Neutral",
                "ticker_sentiment": []
            }
        ]
    })
    .to_string()
}
