//! MCP server over a line-delimited stdio transport.
//!
//! The loop reads one JSON-RPC message per line, fully handles it, writes at
//! most one response line, flushes, and only then reads the next line. A
//! single reader and a single writer keep responses in request order.

use harness_config::{ServerConfig, UnknownMethodPolicy};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::encoder;
use crate::error::{McpError, Result};
use crate::invoker::{Backends, Invoker};
use crate::mapper;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, Method, ServerInfo,
};
use crate::registry::Registry;

/// Identity and routing options.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Reported in the `initialize` reply.
    pub info: ServerInfo,
    /// What to do with methods the server does not implement.
    pub unknown_methods: UnknownMethodPolicy,
}

impl ServerOptions {
    /// Build from the `[server]` config section.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            info: ServerInfo {
                name: config.name.clone(),
                version: config.version.clone(),
            },
            unknown_methods: config.unknown_methods,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Tool server that dispatches `tools/call` to backend processes.
pub struct McpServer<'a, I> {
    registry: &'a Registry,
    backends: Backends,
    invoker: I,
    options: ServerOptions,
}

impl<'a, I: Invoker> McpServer<'a, I> {
    /// Create a server over a registry, backend commands and an invoker.
    pub fn new(registry: &'a Registry, backends: Backends, invoker: I) -> Self {
        Self {
            registry,
            backends,
            invoker,
            options: ServerOptions::default(),
        }
    }

    /// Set identity and routing options.
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// The invoker used for tool calls.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Serve on the process's stdin/stdout until end of input.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve on an arbitrary stream pair until end of input.
    ///
    /// Returns an error only if the input cannot be read or the output
    /// cannot be written. A read failure is reported to the peer with a
    /// final `-32700` message before returning.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            server = %self.options.info.name,
            tools = self.registry.len(),
            "MCP server started, listening on stdin"
        );

        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!("received EOF, shutting down");
                    break;
                }
                Ok(_) => {
                    let response = match std::str::from_utf8(&buf) {
                        Ok(line) => self.handle_line(line).await,
                        Err(e) => {
                            warn!(error = %e, "message is not valid UTF-8");
                            Some(encoder::parse_error(format!("Parse error: invalid UTF-8: {}", e)))
                        }
                    };
                    if let Some(response) = response {
                        write_response(&mut writer, &response).await?;
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to read from input stream");
                    let response = encoder::parse_error(format!("Failed to read input: {}", e));
                    if let Err(write_err) = write_response(&mut writer, &response).await {
                        warn!(error = %write_err, "failed to report read failure");
                    }
                    return Err(McpError::Io(e));
                }
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one raw input line, returning the response to write, if any.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!(line, "received message");

        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "unparsable message");
                Some(encoder::parse_error(format!("Parse error: {}", e)))
            }
        }
    }

    /// Route a parsed request.
    ///
    /// Returns `None` for notifications, wrong-version messages, and (under
    /// the default policy) unknown methods.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if !request.has_valid_version() {
            warn!(jsonrpc = %request.jsonrpc, method = %request.method, "ignoring non-2.0 message");
            return None;
        }

        let method = request.method();
        let Some(id) = request.id else {
            debug!(method = method.as_str(), "notification received");
            return None;
        };

        let outcome = match method {
            Method::Initialize => encoder::success(
                id.clone(),
                &InitializeResult::new(self.options.info.clone()),
            ),
            Method::Initialized => {
                debug!("client initialized");
                return None;
            }
            Method::Ping => encoder::success(id.clone(), &json!({})),
            Method::ToolsList => encoder::success(
                id.clone(),
                &ListToolsResult {
                    tools: self.registry.tool_infos(),
                },
            ),
            Method::ToolsCall => self
                .call_tool(request.params)
                .await
                .and_then(|result| encoder::success(id.clone(), &result)),
            Method::Unknown(name) => {
                return match self.options.unknown_methods {
                    UnknownMethodPolicy::Ignore => {
                        debug!(method = %name, "ignoring unknown method");
                        None
                    }
                    UnknownMethodPolicy::Error => Some(JsonRpcResponse::error(
                        id,
                        JsonRpcError::method_not_found(&name),
                    )),
                };
            }
        };

        Some(outcome.unwrap_or_else(|e| {
            warn!(id = %id, error = %e, "request failed");
            encoder::failure(id, &e)
        }))
    }

    /// Validate, map and run a `tools/call`.
    ///
    /// Errors are limited to lookup and argument problems; a failing backend
    /// process is reported inside the returned result.
    pub async fn call_tool(&self, params: Option<Value>) -> Result<CallToolResult> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| McpError::invalid_params(format!("tools/call: {}", e)))?;

        let tool = self.registry.get(&params.name)?;
        let arguments = mapper::arguments_object(params.arguments)?;
        let argv = mapper::map_arguments(tool, &arguments)?;

        info!(tool = %tool.name, backend = %tool.backend, "dispatching tool call");
        let result = self.invoker.run(self.backends.get(tool.backend), &argv).await;
        encoder::call_tool_result(&result)
    }
}

/// Write one response line and flush.
async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
