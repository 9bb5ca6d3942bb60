//! Error types for tool server operations.

use thiserror::Error;

use crate::protocol::JsonRpcError;

/// Result type for tool server operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for tool server operations.
///
/// Everything except [`McpError::Io`] is scoped to a single request and is
/// reported back to the client as a JSON-RPC error object.
#[derive(Debug, Error)]
pub enum McpError {
    /// The requested tool is not in the registry.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A schema-required argument was omitted.
    #[error("Missing required argument '{argument}' for tool '{tool}'")]
    MissingRequiredArgument {
        /// Tool being called.
        tool: String,
        /// Name of the missing property.
        argument: String,
    },

    /// An argument did not match its declared type or enum.
    #[error("Invalid argument '{argument}' for tool '{tool}': expected {expected}")]
    InvalidArgumentType {
        /// Tool being called.
        tool: String,
        /// Name of the offending property.
        argument: String,
        /// Human-readable description of what was expected.
        expected: String,
    },

    /// The request params were structurally wrong.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on the protocol stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Generic dispatch failure code used for all per-request errors.
    pub const DISPATCH_ERROR: i64 = -32000;

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a missing argument error.
    pub fn missing_argument(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingRequiredArgument {
            tool: tool.into(),
            argument: argument.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(
        tool: impl Into<String>,
        argument: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidArgumentType {
            tool: tool.into(),
            argument: argument.into(),
            expected: expected.into(),
        }
    }

    /// Create an invalid params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::Io(_) => JsonRpcError::PARSE_ERROR,
            _ => Self::DISPATCH_ERROR,
        }
    }

    /// Convert into a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string())
    }
}
