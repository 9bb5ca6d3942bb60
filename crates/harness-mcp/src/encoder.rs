//! Wrapping dispatch outcomes into JSON-RPC envelopes.

use serde::Serialize;
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::invoker::InvocationResult;
use crate::protocol::{CallToolResult, JsonRpcError, JsonRpcResponse, ToolContent};

/// Render an invocation as `tools/call` result content.
///
/// The payload becomes a single pretty-printed JSON text block. Failed
/// invocations are still successful RPC results; they are marked with
/// `isError` so clients can tell them apart without parsing the text.
pub fn call_tool_result(result: &InvocationResult) -> Result<CallToolResult> {
    let text = serde_json::to_string_pretty(&result.payload())?;
    Ok(CallToolResult {
        content: vec![ToolContent::Text { text }],
        is_error: (!result.is_success()).then_some(true),
    })
}

/// Wrap a serializable result for the request `id`.
pub fn success<T: Serialize>(id: Value, result: &T) -> Result<JsonRpcResponse> {
    Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
}

/// Wrap a dispatch error for the request `id`.
pub fn failure(id: Value, error: &McpError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, error.to_rpc_error())
}

/// Stream-level parse error, which has no request to correlate with.
pub fn parse_error(message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_content_is_payload_text() {
        let result = call_tool_result(&InvocationResult::Success(json!({"ok": true}))).unwrap();
        let response = success(json!(3), &result).unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], 3);
        assert!(value["result"].get("isError").is_none());
        let content = value["result"]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        let text = content[0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_payload_is_pretty_printed() {
        let result =
            call_tool_result(&InvocationResult::Success(json!({"tasks": []}))).unwrap();
        assert_eq!(result.text(), "{\n  \"tasks\": []\n}");
    }

    #[test]
    fn test_failed_invocation_is_marked() {
        let result = call_tool_result(&InvocationResult::failed("Command failed: boom")).unwrap();
        assert!(result.is_error());
        let parsed: Value = serde_json::from_str(&result.text()).unwrap();
        assert_eq!(parsed, json!({"error": "Command failed: boom"}));
    }

    #[test]
    fn test_failure_envelope() {
        let response = failure(json!("req-1"), &McpError::unknown_tool("nope"));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": "req-1",
                "error": {"code": -32000, "message": "Unknown tool: nope"}
            })
        );
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let value = serde_json::to_value(parse_error("Parse error: eof")).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
    }
}
