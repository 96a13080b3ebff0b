use serde::{Deserialize, Serialize};

use super::{Symbol, TradingDate};

/// One trading day of OHLCV data for one symbol.
///
/// Natural key: `date` within the symbol's `stock-{SYMBOL}` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: Symbol,
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}
