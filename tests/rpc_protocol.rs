//! Behavior tests for the newline-delimited JSON-RPC front end.

mod common;

use common::{aapl_payload, memory_service, ScriptedHttpClient};
use serde_json::{json, Value};
use tickstash_core::{RpcHandler, ToolResponse};

fn handler(http: std::sync::Arc<ScriptedHttpClient>, keys: &[&str]) -> RpcHandler {
    let (service, _store) = memory_service(http, keys);
    service.rpc()
}

async fn call(handler: &RpcHandler, request: Value) -> Value {
    let line = handler
        .handle_line(&request.to_string())
        .await
        .expect("request with id gets a response");
    serde_json::from_str(&line).expect("response is JSON")
}

fn tool_payload(response: &Value) -> ToolResponse {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("tool response JSON")
}

#[tokio::test]
async fn when_client_initializes_server_reports_tools_capability() {
    // Given: A fresh handler
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    // When: The client sends initialize
    let response = call(
        &handler,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
    )
    .await;

    // Then: Protocol version, tools capability and server info come back
    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(response["result"]["capabilities"]["tools"], json!({}));
    assert_eq!(response["result"]["serverInfo"]["name"], json!("tickstash"));
}

#[tokio::test]
async fn when_client_lists_tools_both_tools_are_described() {
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    let response = call(
        &handler,
        json!({ "jsonrpc": "2.0", "id": "list", "method": "tools/list" }),
    )
    .await;

    let tools = response["result"]["tools"].as_array().expect("tools");
    let names: Vec<&str> = tools.iter().filter_map(|tool| tool["name"].as_str()).collect();
    assert_eq!(names, vec!["get_stock_prices", "get_news"]);
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == json!("object")));
    assert!(tools.iter().all(|tool| tool["description"].is_string()));
}

#[tokio::test]
async fn when_client_calls_get_stock_prices_result_wraps_tool_response_as_text() {
    // Given: A provider that knows AAPL
    let http = ScriptedHttpClient::always(aapl_payload());
    let handler = handler(http.clone(), &["K1"]);

    // When: The tool is called through RPC
    let response = call(
        &handler,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": "get_stock_prices", "arguments": { "symbol": "AAPL" } }
        }),
    )
    .await;

    // Then: The text content is the serialized ToolResponse
    assert_eq!(response["result"]["isError"], json!(false));
    let payload = tool_payload(&response);
    assert_eq!(payload.message, "Fetched 1 price record(s) for AAPL from Alpha Vantage");
    assert_eq!(payload.data[0]["volume"], json!(29360026u64));
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn when_fetch_fails_tool_call_succeeds_with_is_error_flag() {
    // Given: No keys configured
    let http = ScriptedHttpClient::always(aapl_payload());
    let handler = handler(http, &[]);

    // When
    let response = call(
        &handler,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": { "name": "get_stock_prices", "arguments": { "symbol": "AAPL" } }
        }),
    )
    .await;

    // Then: A normal result, flagged as an error, never a protocol error
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], json!(true));
    let payload = tool_payload(&response);
    assert_eq!(payload.data, Value::Null);
    assert!(payload.error.is_some());
}

#[tokio::test]
async fn when_arguments_are_invalid_server_answers_invalid_params_without_fetching() {
    let http = ScriptedHttpClient::always(aapl_payload());
    let handler = handler(http.clone(), &["K1"]);

    for arguments in [
        json!({ "symbol": "AAPL", "date": "2025-1-1" }),
        json!({ "date": "20251223" }),
        json!({ "symbol": "1BAD" }),
    ] {
        let response = call(
            &handler,
            json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": { "name": "get_stock_prices", "arguments": arguments }
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], json!(-32602), "{response}");
    }
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn when_tool_is_unknown_server_answers_invalid_params() {
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    let response = call(
        &handler,
        json!({
            "jsonrpc": "2.0",
            "id": 10,
            "method": "tools/call",
            "params": { "name": "get_quotes", "arguments": {} }
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], json!(-32602));
    assert!(response["error"]["message"]
        .as_str()
        .expect("message")
        .contains("get_quotes"));
}

#[tokio::test]
async fn when_method_is_unknown_server_answers_method_not_found() {
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    let response = call(
        &handler,
        json!({ "jsonrpc": "2.0", "id": 11, "method": "resources/list" }),
    )
    .await;

    assert_eq!(response["id"], json!(11));
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn when_line_is_not_json_server_answers_parse_error() {
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    let line = handler.handle_line("{not json").await.expect("response");
    let response: Value = serde_json::from_str(&line).expect("json");

    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn when_request_is_a_notification_server_stays_silent() {
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);

    let reply = handler
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    assert!(reply.is_none());
    assert!(handler.handle_line("   ").await.is_none());
}

#[tokio::test]
async fn when_input_stream_carries_several_requests_each_gets_one_line() {
    // Given: Three requests, one of them a notification
    let handler = handler(ScriptedHttpClient::always("{}"), &["K1"]);
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n"
    );
    let mut output = Vec::new();

    // When: The serve loop runs to EOF
    handler
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("serve");

    // Then: Two response lines, in order
    let text = String::from_utf8(output).expect("utf8");
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], json!(1));
    assert_eq!(lines[1]["id"], json!(2));
    assert_eq!(lines[1]["result"], json!({}));
}
