//! Collection naming inside the `finance` namespace.

use crate::domain::Symbol;

/// Shared collection for every news article.
pub const NEWS_COLLECTION: &str = "news";

const PRICE_COLLECTION_PREFIX: &str = "stock-";

/// Per-symbol price collection, e.g. `stock-AAPL`.
pub fn price_collection(symbol: &Symbol) -> String {
    format!("{PRICE_COLLECTION_PREFIX}{symbol}")
}

/// Symbol part of a price collection name, if `collection` is one.
pub fn symbol_of(collection: &str) -> Option<&str> {
    collection
        .strip_prefix(PRICE_COLLECTION_PREFIX)
        .filter(|symbol| !symbol.is_empty())
}
