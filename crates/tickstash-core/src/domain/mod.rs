//! Typed records and value objects shared by fetchers, queries and tools.

mod calendar;
mod news;
mod price;
mod symbol;

pub use calendar::{NewsTimestamp, NewsWindow, TradingDate};
pub use news::{NewsArticle, TickerSentiment, TopicRelevance};
pub use price::PricePoint;
pub use symbol::Symbol;
