//! Integration tests for the MCP tool server.
//!
//! These drive the full line-oriented loop over in-memory streams, using
//! either a recording fake invoker or small shell-script backends.

use std::fs;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use harness_mcp::{
    Backends, CommandSpec, InvocationResult, Invoker, McpError, McpServer, ProcessInvoker,
    Registry,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Invoker that records every call and answers with a fixed result.
struct RecordingInvoker {
    result: InvocationResult,
    calls: Mutex<Vec<(CommandSpec, Vec<String>)>>,
}

impl RecordingInvoker {
    fn new(result: InvocationResult) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(CommandSpec, Vec<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Invoker for RecordingInvoker {
    async fn run(&self, command: &CommandSpec, args: &[String]) -> InvocationResult {
        self.calls.lock().push((command.clone(), args.to_vec()));
        self.result.clone()
    }
}

fn fake_backends() -> Backends {
    Backends::new(CommandSpec::new("tasks-bin"), CommandSpec::new("memory-bin"))
}

/// Backends where both families run the given shell script.
fn script_backends(dir: &Path, body: &str) -> Backends {
    let path = dir.join("backend.sh");
    fs::write(&path, body).unwrap();
    let spec = CommandSpec::new("sh").with_arg(path.to_string_lossy().to_string());
    Backends::new(spec.clone(), spec)
}

/// Run the server loop over `input` and return the raw output.
async fn run_raw<I: Invoker>(server: &McpServer<'_, I>, input: &str) -> String {
    let mut output = Vec::new();
    server
        .run(input.as_bytes(), &mut output)
        .await
        .expect("server loop failed");
    String::from_utf8(output).unwrap()
}

/// Run the server loop and parse each output line.
async fn run_lines<I: Invoker>(server: &McpServer<'_, I>, input: &str) -> Vec<Value> {
    run_raw(server, input)
        .await
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is not JSON"))
        .collect()
}

fn call_line(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
    .to_string()
        + "\n"
}

fn content_json(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("missing text content");
    serde_json::from_str(text).expect("content text is not JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tools_list_matches_registry() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let responses = run_lines(
        &server,
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
    )
    .await;
    assert_eq!(responses.len(), 1);

    let tools = responses[0]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), registry.len());

    for descriptor in registry.tools() {
        let matching: Vec<_> = tools
            .iter()
            .filter(|t| t["name"] == descriptor.name.as_str())
            .collect();
        assert_eq!(matching.len(), 1, "{} listed {} times", descriptor.name, matching.len());

        let tool = matching[0];
        assert_eq!(tool["description"], descriptor.description);
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert_eq!(tool["inputSchema"], descriptor.input_schema());
    }
}

#[tokio::test]
async fn test_listed_required_fields_are_enforced() {
    let registry = Registry::builtin();

    for descriptor in registry.tools() {
        // Build a complete, valid argument object.
        let mut complete = serde_json::Map::new();
        for prop in descriptor.properties {
            let value = prop.allowed.first().copied().unwrap_or("value");
            complete.insert(prop.name.to_string(), json!(value));
        }

        let invoker = RecordingInvoker::new(InvocationResult::Success(json!({"ok": true})));
        let server = McpServer::new(&registry, fake_backends(), invoker);

        let listed: Vec<String> = descriptor
            .input_schema()
            .get("required")
            .and_then(|r| r.as_array().cloned())
            .unwrap_or_default()
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();

        for prop in descriptor.properties {
            let mut partial = complete.clone();
            partial.remove(prop.name);
            let line = call_line(1, descriptor.name.as_str(), Value::Object(partial));
            let response = &run_lines(&server, &line).await[0];

            let is_required = listed.iter().any(|r| r == prop.name);
            assert_eq!(
                response.get("error").is_some(),
                is_required,
                "{}.{}: omission outcome disagrees with schema",
                descriptor.name,
                prop.name
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch with a fake invoker
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_required_argument_launches_nothing() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let responses = run_lines(&server, &call_line(17, "task_create", json!({"title": "x"}))).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 17);
    assert_eq!(responses[0]["error"]["code"], -32000);
    assert!(
        responses[0]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("category")
    );
    assert!(server.invoker().calls().is_empty());
}

#[tokio::test]
async fn test_invalid_argument_type_launches_nothing() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let responses = run_lines(&server, &call_line(3, "memory_read", json!({"filename": 12}))).await;
    assert_eq!(responses[0]["id"], 3);
    assert_eq!(responses[0]["error"]["code"], -32000);
    assert!(server.invoker().calls().is_empty());
}

#[tokio::test]
async fn test_call_routes_to_backend_with_mapped_arguments() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({"ok": true}))),
    );

    let input = call_line(
        1,
        "task_create",
        json!({"category": "testing", "title": "Add tests", "priority": "low"}),
    ) + &call_line(2, "memory_list", json!({"tag": "arch"}));
    let responses = run_lines(&server, &input).await;
    assert_eq!(responses.len(), 2);

    let calls = server.invoker().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0.program, "tasks-bin");
    assert_eq!(
        calls[0].1,
        vec!["create", "testing", "Add tests", "--priority", "low"]
    );
    assert_eq!(calls[1].0.program, "memory-bin");
    assert_eq!(calls[1].1, vec!["list", "--tag", "arch"]);
}

#[tokio::test]
async fn test_notification_writes_nothing() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let output = run_raw(
        &server,
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
    )
    .await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_sequential_ids_echoed_in_order() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\
                 {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n";
    let responses = run_lines(&server, input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["id"], 2);
    assert!(responses[1]["result"]["tools"].is_array());
}

#[tokio::test]
async fn test_string_and_null_ids_echoed_verbatim() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let input = "{\"jsonrpc\":\"2.0\",\"id\":\"abc-1\",\"method\":\"ping\"}\n\
                 {\"jsonrpc\":\"2.0\",\"id\":null,\"method\":\"ping\"}\n";
    let responses = run_lines(&server, input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], "abc-1");
    assert_eq!(responses[1]["id"], Value::Null);
    assert!(responses[1].get("result").is_some());
}

#[tokio::test]
async fn test_full_session_survives_bad_lines() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({"tasks": []}))),
    );

    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "this is not json",
        "",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope"}}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"task_context"}}"#,
    ]
    .join("\n")
        + "\n";

    let responses = run_lines(&server, &input).await;
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "agent-harness-tools");

    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], -32700);

    assert_eq!(responses[2]["id"], 2);
    assert_eq!(responses[2]["error"]["message"], "Unknown tool: nope");

    // resources/list is ignored, so the next response is id 4
    assert_eq!(responses[3]["id"], 4);
    assert_eq!(content_json(&responses[3]), json!({"tasks": []}));
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch with real backend processes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_backend_success_json_passthrough() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        script_backends(tmp.path(), "echo '{\"ok\": true}'\n"),
        ProcessInvoker::new(),
    );

    let responses = run_lines(&server, &call_line(1, "task_next", json!({}))).await;
    assert_eq!(responses[0]["id"], 1);
    assert!(responses[0]["result"].get("isError").is_none());
    assert_eq!(content_json(&responses[0]), json!({"ok": true}));
}

#[tokio::test]
async fn test_backend_reported_error_is_successful_rpc() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        script_backends(tmp.path(), "echo '{\"error\": \"bad input\"}'\nexit 1\n"),
        ProcessInvoker::new(),
    );

    let responses = run_lines(&server, &call_line(5, "task_show", json!({"task_id": "T-1"}))).await;
    assert_eq!(responses[0]["id"], 5);
    assert!(responses[0].get("error").is_none());
    assert_eq!(content_json(&responses[0]), json!({"error": "bad input"}));
}

#[tokio::test]
async fn test_backend_silent_failure_uses_stderr() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        script_backends(tmp.path(), "echo 'tasks file is locked' >&2\nexit 1\n"),
        ProcessInvoker::new(),
    );

    let responses = run_lines(&server, &call_line(6, "task_archive", json!({"task_id": "T-2"}))).await;
    assert!(responses[0].get("error").is_none());
    assert_eq!(responses[0]["result"]["isError"], true);

    let payload = content_json(&responses[0]);
    let message = payload["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("tasks file is locked"));
}

#[tokio::test]
async fn test_backend_empty_and_raw_output() {
    let tmp = TempDir::new().unwrap();
    let registry = Registry::builtin();

    let server = McpServer::new(
        &registry,
        script_backends(tmp.path(), "exit 0\n"),
        ProcessInvoker::new(),
    );
    let responses = run_lines(&server, &call_line(1, "task_next", json!({}))).await;
    assert_eq!(content_json(&responses[0]), json!({"success": true}));

    let server = McpServer::new(
        &registry,
        script_backends(tmp.path(), "echo \"created $2\"\n"),
        ProcessInvoker::new(),
    );
    let responses = run_lines(
        &server,
        &call_line(2, "memory_create", json!({"title": "notes", "content": "c"})),
    )
    .await;
    assert_eq!(content_json(&responses[0]), json!({"raw_output": "created notes"}));
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream failures
// ─────────────────────────────────────────────────────────────────────────────

/// Reader that fails on every read.
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("stdin went away")))
    }
}

#[tokio::test]
async fn test_read_failure_is_fatal_with_final_error() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let input = &b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n"[..];
    let input = input.chain(BrokenReader);
    let mut output = Vec::new();
    let err = server
        .run(BufReader::new(input), &mut output)
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Io(_)));

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert!(
        lines[1]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("stdin went away")
    );
}

#[tokio::test]
async fn test_invalid_utf8_line_is_parse_error_and_not_run() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({"ok": true}))),
    );

    let mut input = br#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"memory_create","arguments":{"title":"a"#.to_vec();
    input.push(0xFF);
    input.extend_from_slice(br#"b","content":"c"}}}"#);
    input.push(b'\n');
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");

    let mut output = Vec::new();
    server.run(&input[..], &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], Value::Null);
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], 2);
    assert!(server.invoker().calls().is_empty());
}

#[tokio::test]
async fn test_wrong_typed_version_and_method_are_skipped() {
    let registry = Registry::builtin();
    let server = McpServer::new(
        &registry,
        fake_backends(),
        RecordingInvoker::new(InvocationResult::Success(json!({}))),
    );

    let input = "{\"jsonrpc\":2.0,\"id\":1,\"method\":\"ping\"}\n\
                 {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":5}\n\
                 {\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n";
    let responses = run_lines(&server, input).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 3);
}
