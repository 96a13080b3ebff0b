//! Newline-delimited JSON-RPC 2.0 front end for the tool registry.
//!
//! One request per line in, one response per line out. Requests without an
//! `id` are notifications and get no response line.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::tools::{ToolError, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

struct Request {
    id: Option<Value>,
    method: String,
    params: Value,
}

/// Stateless JSON-RPC dispatcher over a [`ToolRegistry`].
#[derive(Clone)]
pub struct RpcHandler {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
}

impl RpcHandler {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_name: String::from("tickstash"),
            server_version: String::from(env!("CARGO_PKG_VERSION")),
        }
    }

    /// Read requests from `reader` until EOF, writing one response line each.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        debug!("rpc input closed");
        Ok(())
    }

    /// Handle one raw request line. `None` for blank lines and notifications.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        if line.trim().is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Err(error) => Some(RpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {error}"),
            )),
            Ok(value) => match parse_request(value) {
                Err(response) => Some(response),
                Ok(request) => self.dispatch(request).await,
            },
        }?;

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(error) => {
                warn!(%error, "rpc response could not be encoded");
                Some(format!(
                    concat!(
                        r#"{{"jsonrpc":"2.0","id":null,"#,
                        r#""error":{{"code":{},"message":"response encoding failed"}}}}"#
                    ),
                    INTERNAL_ERROR
                ))
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Option<RpcResponse> {
        debug!(method = %request.method, notification = request.id.is_none(), "rpc request");

        let id = request.id?;

        let outcome = match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.list_tools() })),
            "tools/call" => self.call_tool(&request.params).await,
            other => Err((METHOD_NOT_FOUND, format!("method '{other}' not found"))),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err((code, message)) => RpcResponse::failure(id, code, message),
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err((INVALID_PARAMS, String::from("tools/call requires a string 'name'")));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.registry.call_tool(name, &arguments).await {
            Ok(response) => {
                let text = serde_json::to_string(&response)
                    .map_err(|error| (INTERNAL_ERROR, error.to_string()))?;
                Ok(json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": response.is_error(),
                }))
            }
            Err(error @ (ToolError::UnknownTool { .. } | ToolError::InvalidArguments { .. })) => {
                Err((INVALID_PARAMS, error.to_string()))
            }
            Err(error @ ToolError::Query(_)) => {
                warn!(tool = name, %error, "tool call failed");
                Err((INTERNAL_ERROR, error.to_string()))
            }
        }
    }
}

fn parse_request(value: Value) -> Result<Request, RpcResponse> {
    let mut object: Map<String, Value> = match value {
        Value::Object(object) => object,
        Value::Array(_) => {
            return Err(RpcResponse::failure(
                Value::Null,
                INVALID_REQUEST,
                "batch requests are not supported",
            ))
        }
        _ => {
            return Err(RpcResponse::failure(
                Value::Null,
                INVALID_REQUEST,
                "request must be a JSON object",
            ))
        }
    };

    let id = object.remove("id");
    let reply_id = id.clone().unwrap_or(Value::Null);
    if !matches!(id, None | Some(Value::Null | Value::Number(_) | Value::String(_))) {
        return Err(RpcResponse::failure(
            Value::Null,
            INVALID_REQUEST,
            "id must be a string, number or null",
        ));
    }
    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(RpcResponse::failure(
            reply_id,
            INVALID_REQUEST,
            "jsonrpc must be \"2.0\"",
        ));
    }
    let Some(Value::String(method)) = object.remove("method") else {
        return Err(RpcResponse::failure(
            reply_id,
            INVALID_REQUEST,
            "method must be a string",
        ));
    };

    Ok(Request {
        id,
        method,
        params: object.remove("params").unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_rejected_as_invalid_requests() {
        let error = parse_request(json!([{ "jsonrpc": "2.0", "id": 1, "method": "ping" }]))
            .err()
            .expect("batch");
        assert_eq!(error.error.map(|e| e.code), Some(INVALID_REQUEST));
    }

    #[test]
    fn wrong_version_keeps_the_request_id() {
        let error = parse_request(json!({ "jsonrpc": "1.0", "id": 7, "method": "ping" }))
            .err()
            .expect("version");
        assert_eq!(error.id, json!(7));
        assert_eq!(error.error.map(|e| e.code), Some(INVALID_REQUEST));
    }

    #[test]
    fn missing_id_marks_a_notification() {
        let request = parse_request(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .ok()
        .expect("notification");
        assert!(request.id.is_none());
        assert_eq!(request.params, Value::Null);
    }
}
