use std::sync::Arc;

use tickstash_warehouse::{DocumentStore, Filter};
use tracing::{info, warn};

use super::{upsert_record, Upstream};
use crate::config::DEFAULT_NEWS_FETCH_LIMIT;
use crate::credentials::Credential;
use crate::domain::NewsWindow;
use crate::partition::NEWS_COLLECTION;
use crate::FetchError;

/// News-sentiment fetcher writing into the shared `news` collection keyed by
/// publication timestamp.
#[derive(Clone)]
pub struct NewsFetcher {
    upstream: Upstream,
    store: Arc<dyn DocumentStore>,
    limit: usize,
}

impl NewsFetcher {
    pub fn new(upstream: Upstream, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            upstream,
            store,
            limit: DEFAULT_NEWS_FETCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn fetch_and_store(&self, window: &NewsWindow) -> Result<usize, FetchError> {
        let credential = self.upstream.rotator.next_credential()?;

        self.upstream.pacer.admit().await;
        let outcome = self.pull(window, &credential).await;
        self.upstream.pacer.pace().await;

        let (from, to) = (window.from(), window.to());
        match &outcome {
            Ok(upserted) => info!(%from, %to, upserted, "stored news articles"),
            Err(error) => warn!(%from, %to, %error, "news fetch failed"),
        }
        outcome
    }

    async fn pull(
        &self,
        window: &NewsWindow,
        credential: &Credential,
    ) -> Result<usize, FetchError> {
        let articles = self
            .upstream
            .client
            .news_sentiment(window, self.limit, credential)
            .await?;

        let mut upserted = 0;
        for article in &articles {
            let key = Filter::eq("time_published", article.time_published.canonical());
            upsert_record(self.store.as_ref(), NEWS_COLLECTION, key, article)?;
            upserted += 1;
        }
        Ok(upserted)
    }
}
