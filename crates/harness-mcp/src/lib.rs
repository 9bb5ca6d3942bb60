//! MCP (Model Context Protocol) tool server for the agent harness.
//!
//! This crate exposes a fixed catalog of tools over JSON-RPC on stdio and
//! runs each tool call as an external backend process.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpServer                                                  │
//! │  - Reads one JSON-RPC message per line                      │
//! │  - Implements initialize, ping, tools/list, tools/call      │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────┐
//! │  Registry + mapper           │   │  Invoker                 │
//! │  - Static tool schemas       │   │  - Spawns the backend    │
//! │  - Arguments → argv          │   │  - Normalizes the output │
//! └──────────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use harness_mcp::{Backends, McpServer, ProcessInvoker, Registry};
//!
//! let config = harness_config::load_config(None).config;
//! let registry = Registry::builtin();
//! let backends = Backends::from_config(&config.backends(), &config.invoker());
//! let server = McpServer::new(&registry, backends, ProcessInvoker::from_config(&config.invoker()));
//! server.serve_stdio().await?;
//! ```
//!
//! # Wire format
//!
//! ```text
//! → {"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "task_show", "arguments": {"task_id": "T-1"}}}
//! ← {"jsonrpc": "2.0", "id": 1, "result": {"content": [{"type": "text", "text": "{...}"}]}}
//! ```

pub mod encoder;
pub mod error;
pub mod invoker;
pub mod mapper;
pub mod protocol;
pub mod registry;
pub mod server;

// Re-export main types
pub use error::{McpError, Result};
pub use invoker::{
    Backends, CommandSpec, InvocationResult, Invoker, ProcessInvoker, ToolFailure,
    interpret_output,
};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, Method, ServerCapabilities, ServerInfo, ToolContent,
    ToolInfo, ToolsCapability,
};
pub use registry::{Backend, Binding, PropertySchema, PropertyType, Registry, ToolDescriptor, ToolName};
pub use server::{McpServer, ServerOptions};
