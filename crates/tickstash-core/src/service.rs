use std::sync::Arc;

use tickstash_warehouse::{DocumentStore, MemoryStore, StoreError, Warehouse, WarehouseConfig};
use tracing::info;

use crate::adapters::AlphaVantageClient;
use crate::config::ServiceConfig;
use crate::credentials::KeyRotator;
use crate::fetch::{MarketDataFetcher, NewsFetcher, Upstream};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::pacing::RequestPacer;
use crate::provider_policy::ProviderPolicy;
use crate::query::QueryService;
use crate::rpc::RpcHandler;
use crate::tools::ToolRegistry;

/// Which document store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    DuckDb,
    Memory,
}

/// Root object owning the store handle, key rotator and pacer, and wiring
/// them into fetchers, queries and tools.
#[derive(Clone)]
pub struct TickstashService {
    config: ServiceConfig,
    store: Arc<dyn DocumentStore>,
    rotator: Arc<KeyRotator>,
    pacer: RequestPacer,
    price_fetcher: MarketDataFetcher,
    news_fetcher: NewsFetcher,
    query: Arc<QueryService>,
    tools: ToolRegistry,
}

impl TickstashService {
    /// Production wiring: reqwest transport, file-backed keys, policy pacing.
    pub fn open(config: ServiceConfig, backend: StoreBackend) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = match backend {
            StoreBackend::DuckDb => Arc::new(Warehouse::open(WarehouseConfig::new(
                config.db_path.clone(),
                config.namespace.clone(),
            ))?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let rotator = KeyRotator::from_file(config.keys_file.clone());
        let pacer = RequestPacer::from_policy(&ProviderPolicy::from_config(&config));

        info!(
            backend = ?backend,
            db_path = %config.db_path.display(),
            keys_file = %config.keys_file.display(),
            "tickstash service ready"
        );
        Ok(Self::assemble(
            config,
            store,
            Arc::new(ReqwestHttpClient::new()),
            rotator,
            pacer,
        ))
    }

    /// Wire a service from explicit parts.
    pub fn assemble(
        config: ServiceConfig,
        store: Arc<dyn DocumentStore>,
        http_client: Arc<dyn HttpClient>,
        rotator: KeyRotator,
        pacer: RequestPacer,
    ) -> Self {
        let rotator = Arc::new(rotator);
        let policy = ProviderPolicy::from_config(&config);
        let client = AlphaVantageClient::new(
            http_client,
            config.base_url.clone(),
            policy.request_timeout,
        );
        let upstream = Upstream::new(client, Arc::clone(&rotator), pacer.clone());

        let price_fetcher = MarketDataFetcher::new(upstream.clone(), Arc::clone(&store))
            .with_output_size(config.output_size);
        let news_fetcher =
            NewsFetcher::new(upstream, Arc::clone(&store)).with_limit(config.news_fetch_limit);
        let query = Arc::new(
            QueryService::new(Arc::clone(&store), price_fetcher.clone())
                .with_price_history_limit(config.price_history_limit),
        );
        let tools = ToolRegistry::new(Arc::clone(&query));

        Self {
            config,
            store,
            rotator,
            pacer,
            price_fetcher,
            news_fetcher,
            query,
            tools,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn rotator(&self) -> &Arc<KeyRotator> {
        &self.rotator
    }

    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }

    pub fn price_fetcher(&self) -> &MarketDataFetcher {
        &self.price_fetcher
    }

    pub fn news_fetcher(&self) -> &NewsFetcher {
        &self.news_fetcher
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn rpc(&self) -> RpcHandler {
        RpcHandler::new(self.tools.clone())
    }
}
