use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::credentials::Credential;
use crate::domain::{
    NewsArticle, NewsTimestamp, NewsWindow, PricePoint, Symbol, TickerSentiment, TopicRelevance,
    TradingDate,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::FetchError;

const DAILY_SERIES_FIELD: &str = "Time Series (Daily)";

/// `outputsize` of the daily series endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSize {
    /// Latest 100 trading days.
    #[default]
    Compact,
    /// Full history.
    Full,
}

impl OutputSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl Display for OutputSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed client for the two Alpha Vantage endpoints tickstash consumes.
///
/// Responses are decoded into domain records here; raw payloads never leave
/// this module.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl AlphaVantageClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `TIME_SERIES_DAILY` for one symbol, oldest first.
    pub async fn daily_series(
        &self,
        symbol: &Symbol,
        output_size: OutputSize,
        credential: &Credential,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let request = HttpRequest::get(&self.base_url)
            .with_query("function", "TIME_SERIES_DAILY")
            .with_query("symbol", symbol.as_str())
            .with_query("outputsize", output_size.as_str())
            .with_query("apikey", credential.expose())
            .with_timeout(self.timeout);

        let response: DailySeriesResponse = self.get_json(request).await?;
        response.status.check()?;

        let Some(series) = response.time_series else {
            return Err(FetchError::parse(response.status.missing_field_message(
                DAILY_SERIES_FIELD,
                &format!("symbol {symbol}"),
            )));
        };

        series
            .into_iter()
            .map(|(date, bar)| bar.into_price_point(symbol, &date))
            .collect()
    }

    /// `NEWS_SENTIMENT` for one publication window.
    pub async fn news_sentiment(
        &self,
        window: &NewsWindow,
        limit: usize,
        credential: &Credential,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let request = HttpRequest::get(&self.base_url)
            .with_query("function", "NEWS_SENTIMENT")
            .with_query("time_from", window.from().query_form())
            .with_query("time_to", window.to().query_form())
            .with_query("limit", limit.to_string())
            .with_query("apikey", credential.expose())
            .with_timeout(self.timeout);

        let response: NewsResponse = self.get_json(request).await?;
        response.status.check()?;

        let feed = match response.feed {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(FetchError::parse("'feed' is not an array")),
            None => {
                return Err(FetchError::parse(
                    response.status.missing_field_message("feed", "news window"),
                ))
            }
        };

        feed.into_iter()
            .enumerate()
            .map(|(index, item)| {
                let raw: RawArticle = serde_json::from_value(item).map_err(|error| {
                    FetchError::parse(format!("feed item {index} is malformed: {error}"))
                })?;
                raw.into_article()
            })
            .collect()
    }

    async fn get_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, FetchError> {
        debug!(url = %request.redacted_url(), "alphavantage request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| {
                FetchError::network(format!("alphavantage transport error: {}", e.message()))
            })?;

        if !response.is_success() {
            return Err(FetchError::api(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }

        let value: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::parse(format!("alphavantage response is not JSON: {e}")))?;
        if !value.is_object() {
            return Err(FetchError::parse("alphavantage response is not a JSON object"));
        }

        serde_json::from_value(value)
            .map_err(|e| FetchError::parse(format!("failed to decode alphavantage response: {e}")))
    }
}

/// Fields Alpha Vantage uses to report problems instead of data.
#[derive(Debug, Default, Deserialize)]
struct ResponseStatus {
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
}

impl ResponseStatus {
    fn check(&self) -> Result<(), FetchError> {
        match self.error_message.as_deref().or(self.error.as_deref()) {
            Some(message) => Err(FetchError::api(message.to_owned())),
            None => Ok(()),
        }
    }

    fn missing_field_message(&self, field: &str, subject: &str) -> String {
        match self.note.as_deref().or(self.information.as_deref()) {
            Some(notice) => format!("no '{field}' in response for {subject}: {notice}"),
            None => format!("no '{field}' in response for {subject}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    time_series: Option<BTreeMap<String, DailyBar>>,
    #[serde(flatten)]
    status: ResponseStatus,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: FlexNumber,
    #[serde(rename = "2. high")]
    high: FlexNumber,
    #[serde(rename = "3. low")]
    low: FlexNumber,
    #[serde(rename = "4. close")]
    close: FlexNumber,
    #[serde(rename = "5. volume")]
    volume: FlexNumber,
}

impl DailyBar {
    fn into_price_point(self, symbol: &Symbol, date: &str) -> Result<PricePoint, FetchError> {
        let trading_date = TradingDate::parse(date)
            .map_err(|e| FetchError::parse(format!("series key for {symbol}: {e}")))?;
        let price = |field: &str, value: &FlexNumber| {
            value.as_f64().ok_or_else(|| {
                FetchError::parse(format!(
                    "{field} '{value}' for {symbol} on {date} is not a number"
                ))
            })
        };

        Ok(PricePoint {
            symbol: symbol.clone(),
            date: trading_date,
            open: price("open", &self.open)?,
            high: price("high", &self.high)?,
            low: price("low", &self.low)?,
            close: price("close", &self.close)?,
            volume: self.volume.as_u64().ok_or_else(|| {
                FetchError::parse(format!(
                    "volume '{}' for {symbol} on {date} is not a whole number",
                    self.volume
                ))
            })?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    feed: Option<serde_json::Value>,
    #[serde(flatten)]
    status: ResponseStatus,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    time_published: String,
    #[serde(default)]
    authors: Option<Vec<String>>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    banner_image: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    category_within_source: Option<String>,
    #[serde(default)]
    source_domain: Option<String>,
    #[serde(default)]
    topics: Option<Vec<RawTopic>>,
    #[serde(default)]
    overall_sentiment_score: Option<FlexNumber>,
    #[serde(default)]
    overall_sentiment_label: Option<String>,
    #[serde(default)]
    ticker_sentiment: Option<Vec<RawTickerSentiment>>,
}

#[derive(Debug, Deserialize)]
struct RawTopic {
    topic: String,
    #[serde(default)]
    relevance_score: Option<FlexNumber>,
}

#[derive(Debug, Deserialize)]
struct RawTickerSentiment {
    ticker: String,
    #[serde(default)]
    relevance_score: Option<FlexNumber>,
    #[serde(default)]
    ticker_sentiment_score: Option<FlexNumber>,
    #[serde(default)]
    ticker_sentiment_label: Option<String>,
}

impl RawArticle {
    fn into_article(self) -> Result<NewsArticle, FetchError> {
        let time_published = NewsTimestamp::parse(&self.time_published)
            .map_err(|e| FetchError::parse(format!("article time_published: {e}")))?;

        Ok(NewsArticle {
            title: self.title.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            time_published,
            authors: self.authors.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            banner_image: self.banner_image.filter(|image| !image.is_empty()),
            source: self.source.unwrap_or_default(),
            category_within_source: self.category_within_source.unwrap_or_default(),
            source_domain: self.source_domain.unwrap_or_default(),
            topics: self
                .topics
                .unwrap_or_default()
                .into_iter()
                .map(|topic| TopicRelevance {
                    topic: topic.topic,
                    relevance_score: score(topic.relevance_score.as_ref()),
                })
                .collect(),
            overall_sentiment_score: score(self.overall_sentiment_score.as_ref()),
            overall_sentiment_label: self.overall_sentiment_label.unwrap_or_default(),
            ticker_sentiment: self
                .ticker_sentiment
                .unwrap_or_default()
                .into_iter()
                .map(|entry| TickerSentiment {
                    ticker: entry.ticker,
                    relevance_score: score(entry.relevance_score.as_ref()),
                    ticker_sentiment_score: score(entry.ticker_sentiment_score.as_ref()),
                    ticker_sentiment_label: entry.ticker_sentiment_label.unwrap_or_default(),
                })
                .collect(),
        })
    }
}

fn score(value: Option<&FlexNumber>) -> f64 {
    value.and_then(FlexNumber::as_f64).unwrap_or_default()
}

/// Number the provider may send either as JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FlexNumber {
    Number(f64),
    Text(String),
}

impl FlexNumber {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Text(text) if text.trim().bytes().all(|b| b.is_ascii_digit()) => {
                text.trim().parse().ok()
            }
            _ => {
                let value = self.as_f64()?;
                (value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
                    .then_some(value as u64)
            }
        }
    }
}

impl Display for FlexNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
