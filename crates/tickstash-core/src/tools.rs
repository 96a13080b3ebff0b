//! The two query tools exposed over RPC and the CLI.
//!
//! | Tool | Arguments | Cache fill |
//! |------|-----------|------------|
//! | `get_stock_prices` | `symbol`, optional `date` (`YYYYMMDD`) | yes |
//! | `get_news` | `from`, `to`, optional `keyword` | no |
//!
//! Every call resolves to a [`ToolResponse`]. Only bad input and cache read
//! failures become a [`ToolError`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::domain::{NewsWindow, PricePoint, Symbol, TradingDate};
use crate::query::{PriceLookup, QueryService};
use crate::{FetchErrorKind, QueryError, ValidationError};

pub const GET_STOCK_PRICES: &str = "get_stock_prices";
pub const GET_NEWS: &str = "get_news";

/// Name, description and JSON schema of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result payload of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub message: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: GET_STOCK_PRICES,
            description: "Daily OHLCV prices for a ticker symbol. Reads the local cache and \
                          fetches from Alpha Vantage when nothing is cached yet.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "Ticker symbol, e.g. AAPL"
                    },
                    "date": {
                        "type": "string",
                        "description": "Trading date as YYYYMMDD; omit for the latest records",
                        "pattern": "^[0-9]{8}$"
                    }
                },
                "required": ["symbol"],
                "additionalProperties": false
            }),
        },
        ToolDescriptor {
            name: GET_NEWS,
            description: "Cached news-sentiment articles published in a time window, \
                          optionally filtered by a keyword in the title or summary.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {
                        "type": "string",
                        "description": "Window start as YYYYMMDD, YYYYMMDDTHHMM or YYYYMMDDTHHMMSS"
                    },
                    "to": {
                        "type": "string",
                        "description": concat!(
                            "Window end as YYYYMMDD, YYYYMMDDTHHMM or YYYYMMDDTHHMMSS; ",
                            "a bare date covers the whole day"
                        )
                    },
                    "keyword": {
                        "type": "string",
                        "description": "Case-insensitive text to look for in title or summary"
                    }
                },
                "required": ["from", "to"],
                "additionalProperties": false
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct PriceArguments {
    symbol: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsArguments {
    from: Option<String>,
    to: Option<String>,
    keyword: Option<String>,
}

/// Dispatches tool calls onto the [`QueryService`].
#[derive(Clone)]
pub struct ToolRegistry {
    query: Arc<QueryService>,
}

impl ToolRegistry {
    pub fn new(query: Arc<QueryService>) -> Self {
        Self { query }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        tool_descriptors()
    }

    /// Run tool `name` with JSON `arguments` (an object, or null for none).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<ToolResponse, ToolError> {
        let span = info_span!("tool_call", tool = name, request_id = %Uuid::new_v4());
        async move {
            let response = match name {
                GET_STOCK_PRICES => {
                    let args: PriceArguments = decode_arguments(GET_STOCK_PRICES, arguments)?;
                    let symbol = required(GET_STOCK_PRICES, "symbol", args.symbol)?;
                    self.get_stock_prices(&symbol, args.date.as_deref()).await?
                }
                GET_NEWS => {
                    let args: NewsArguments = decode_arguments(GET_NEWS, arguments)?;
                    let from = required(GET_NEWS, "from", args.from)?;
                    let to = required(GET_NEWS, "to", args.to)?;
                    self.get_news(&from, &to, args.keyword.as_deref())?
                }
                other => {
                    return Err(ToolError::UnknownTool {
                        name: other.to_owned(),
                    })
                }
            };
            info!(is_error = response.is_error(), "{}", response.message);
            Ok(response)
        }
        .instrument(span)
        .await
    }

    pub async fn get_stock_prices(
        &self,
        symbol: &str,
        date: Option<&str>,
    ) -> Result<ToolResponse, ToolError> {
        let invalid = |source| ToolError::InvalidArguments {
            tool: GET_STOCK_PRICES,
            source,
        };
        let symbol = Symbol::parse(symbol).map_err(invalid)?;
        let date = date
            .map(str::trim)
            .filter(|date| !date.is_empty())
            .map(TradingDate::parse)
            .transpose()
            .map_err(invalid)?;

        let lookup = self.query.get_prices(&symbol, date).await?;
        Ok(price_response(&symbol, date.is_some(), lookup))
    }

    pub fn get_news(
        &self,
        from: &str,
        to: &str,
        keyword: Option<&str>,
    ) -> Result<ToolResponse, ToolError> {
        let window = NewsWindow::parse(from, to).map_err(|source| ToolError::InvalidArguments {
            tool: GET_NEWS,
            source,
        })?;
        let keyword = keyword.map(str::trim).filter(|keyword| !keyword.is_empty());

        let articles = self.query.get_news(&window, keyword)?;
        let mut message = format!(
            "Found {} news article(s) between {} and {}",
            articles.len(),
            window.from(),
            window.to()
        );
        if let Some(keyword) = keyword {
            message.push_str(&format!(" matching '{keyword}'"));
        }

        Ok(ToolResponse {
            message,
            data: to_data(&articles),
            error: None,
        })
    }
}

fn price_response(symbol: &Symbol, single: bool, lookup: PriceLookup) -> ToolResponse {
    match lookup {
        PriceLookup::Cached(records) => ToolResponse {
            message: format!(
                "Retrieved {} price record(s) for {symbol} from cache",
                records.len()
            ),
            data: price_data(&records, single),
            error: None,
        },
        PriceLookup::Fetched(records) => ToolResponse {
            message: format!(
                "Fetched {} price record(s) for {symbol} from Alpha Vantage",
                records.len()
            ),
            data: price_data(&records, single),
            error: None,
        },
        PriceLookup::NotFound { detail } => ToolResponse {
            message: format!(
                "No price data found for {symbol} even after fetching from Alpha Vantage"
            ),
            data: Value::Null,
            error: detail,
        },
        PriceLookup::FetchFailed(error) if error.kind() == FetchErrorKind::Configuration => {
            ToolResponse {
                message: format!(
                    "Cannot fetch {symbol}: Alpha Vantage API keys are not configured"
                ),
                data: Value::Null,
                error: Some(format!(
                    "{error}. Put one Alpha Vantage API key per line in the key file \
                     (TICKSTASH_KEYS_FILE, default ~/.tickstash/api_keys.txt) and retry."
                )),
            }
        }
        PriceLookup::FetchFailed(error) => ToolResponse {
            message: format!("Failed to fetch price data for {symbol}"),
            data: Value::Null,
            error: Some(error.to_string()),
        },
    }
}

fn price_data(records: &[PricePoint], single: bool) -> Value {
    match (single, records.first()) {
        (true, Some(record)) => to_data(record),
        _ => to_data(records),
    }
}

fn to_data<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn decode_arguments<T: for<'de> Deserialize<'de>>(
    tool: &'static str,
    arguments: &Value,
) -> Result<T, ToolError> {
    let object = match arguments {
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => arguments.clone(),
        _ => {
            return Err(ToolError::InvalidArguments {
                tool,
                source: ValidationError::InvalidArgument {
                    name: "arguments",
                    reason: String::from("expected a JSON object"),
                },
            })
        }
    };

    serde_json::from_value(object).map_err(|error| ToolError::InvalidArguments {
        tool,
        source: ValidationError::InvalidArgument {
            name: "arguments",
            reason: error.to_string(),
        },
    })
}

fn required(
    tool: &'static str,
    name: &'static str,
    value: Option<String>,
) -> Result<String, ToolError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ToolError::InvalidArguments {
            tool,
            source: ValidationError::MissingArgument { name },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchError;

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("symbol")
    }

    #[test]
    fn catalog_lists_both_tools_with_schemas() {
        let tools = tool_descriptors();
        let names: Vec<_> = tools.iter().map(|tool| tool.name).collect();
        assert_eq!(names, vec![GET_STOCK_PRICES, GET_NEWS]);
        assert_eq!(tools[0].input_schema["required"], json!(["symbol"]));
        assert_eq!(tools[1].input_schema["required"], json!(["from", "to"]));
    }

    #[test]
    fn configuration_failures_carry_remediation() {
        let response = price_response(
            &aapl(),
            false,
            PriceLookup::FetchFailed(FetchError::configuration("api key file not found at /x")),
        );
        assert_eq!(
            response.message,
            "Cannot fetch AAPL: Alpha Vantage API keys are not configured"
        );
        assert_eq!(response.data, Value::Null);
        let error = response.error.expect("error");
        assert!(error.contains("not found at /x"));
        assert!(error.contains("TICKSTASH_KEYS_FILE"));
    }

    #[test]
    fn other_failures_carry_raw_error_text() {
        let response = price_response(
            &aapl(),
            false,
            PriceLookup::FetchFailed(FetchError::network("connection refused")),
        );
        assert_eq!(response.message, "Failed to fetch price data for AAPL");
        assert_eq!(response.error.as_deref(), Some("network_error: connection refused"));
    }

    #[test]
    fn not_found_is_not_serialized_with_empty_error() {
        let response = price_response(&aapl(), false, PriceLookup::NotFound { detail: None });
        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(
            value,
            json!({
                "message": "No price data found for AAPL even after fetching from Alpha Vantage",
                "data": null
            })
        );
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let error = decode_arguments::<PriceArguments>(GET_STOCK_PRICES, &json!(["AAPL"]))
            .expect_err("array arguments");
        assert!(matches!(error, ToolError::InvalidArguments { .. }));
    }
}
