use serde::{Deserialize, Serialize};

use super::NewsTimestamp;

/// Normalized news-sentiment article.
///
/// Natural key: `time_published` within the shared `news` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub time_published: NewsTimestamp,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category_within_source: String,
    #[serde(default)]
    pub source_domain: String,
    #[serde(default)]
    pub topics: Vec<TopicRelevance>,
    pub overall_sentiment_score: f64,
    pub overall_sentiment_label: String,
    #[serde(default)]
    pub ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRelevance {
    pub topic: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSentiment {
    pub ticker: String,
    pub relevance_score: f64,
    pub ticker_sentiment_score: f64,
    pub ticker_sentiment_label: String,
}
