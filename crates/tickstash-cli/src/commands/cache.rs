use serde::Serialize;
use tickstash_core::partition::symbol_of;
use tickstash_core::{Filter, TickstashService};

use crate::error::CliError;

use super::Outcome;

#[derive(Debug, Serialize)]
struct CollectionStats {
    collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<String>,
    records: usize,
}

#[derive(Debug, Serialize)]
struct CacheStats {
    namespace: String,
    db_path: String,
    collections: Vec<CollectionStats>,
}

pub fn stats(service: &TickstashService) -> Result<Outcome, CliError> {
    let store = service.store();
    let mut names = store.collections()?;
    names.sort();

    let collections = names
        .into_iter()
        .map(|collection| {
            let records = store.count(&collection, &Filter::All)?;
            Ok(CollectionStats {
                symbol: symbol_of(&collection).map(str::to_owned),
                collection,
                records,
            })
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    let config = service.config();
    let stats = CacheStats {
        namespace: config.namespace.clone(),
        db_path: config.db_path.display().to_string(),
        collections,
    };
    Ok(Outcome::Data(serde_json::to_value(stats)?))
}
