use serde::Serialize;
use tickstash_core::{price_collection, NewsWindow, Symbol, TickstashService, NEWS_COLLECTION};

use crate::cli::FetchCommand;
use crate::error::CliError;

use super::Outcome;

#[derive(Debug, Serialize)]
struct FetchSummary {
    collection: String,
    upserted: usize,
}

pub async fn run(command: &FetchCommand, service: &TickstashService) -> Result<Outcome, CliError> {
    let summary = match command {
        FetchCommand::Prices { symbol } => {
            let symbol = Symbol::parse(symbol)?;
            let upserted = service.price_fetcher().fetch_and_store(&symbol).await?;
            FetchSummary {
                collection: price_collection(&symbol),
                upserted,
            }
        }
        FetchCommand::News(window) => {
            let window = NewsWindow::parse(&window.from, &window.to)?;
            let upserted = service.news_fetcher().fetch_and_store(&window).await?;
            FetchSummary {
                collection: NEWS_COLLECTION.to_owned(),
                upserted,
            }
        }
    };
    Ok(Outcome::Data(serde_json::to_value(summary)?))
}
