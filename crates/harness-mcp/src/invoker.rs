//! Backend process invocation.
//!
//! A tool call ends up as one child process. The invoker spawns it with the
//! mapped arguments plus a structured-output selector, captures stdout and
//! stderr, and folds exit status and output into an [`InvocationResult`].
//! This is the only place that looks at exit codes.
//!
//! ## Backend contract
//!
//! | exit | stdout | result |
//! |---|---|---|
//! | 0 | empty | success, `{"success": true}` |
//! | 0 | JSON | success, parsed JSON |
//! | 0 | other text | success, `{"raw_output": text}` |
//! | non-zero | JSON object with `error` | failure, the object as reported |
//! | non-zero | anything else | failure, `Command failed: <stderr>` |

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use harness_config::{BackendConfig, BackendsConfig, InvokerConfig};
use serde_json::{Value, json};

use crate::registry::Backend;

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// A failed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    /// Human-readable failure message.
    pub message: String,
    /// Structured error document printed by the backend, if any.
    pub report: Option<Value>,
    /// Whether retrying the same call may succeed (e.g. after a timeout).
    pub retryable: bool,
}

/// Normalized outcome of running a backend process.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    /// The process succeeded; holds its parsed output.
    Success(Value),
    /// The process failed.
    Failure(ToolFailure),
}

impl InvocationResult {
    /// A failure with only a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            message: message.into(),
            report: None,
            retryable: false,
        })
    }

    /// A failure worth retrying.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            message: message.into(),
            report: None,
            retryable: true,
        })
    }

    /// A failure the backend described itself with a structured document.
    pub fn reported(document: Value) -> Self {
        let message = match document.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        };
        Self::Failure(ToolFailure {
            message,
            report: Some(document),
            retryable: false,
        })
    }

    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure message, if the invocation failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(&failure.message),
        }
    }

    /// The document returned to the client.
    ///
    /// Backend-reported error documents are passed through untouched; other
    /// failures become `{"error": message}`.
    pub fn payload(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Failure(ToolFailure {
                report: Some(document),
                ..
            }) => document.clone(),
            Self::Failure(ToolFailure {
                message, retryable, ..
            }) => {
                if *retryable {
                    json!({"error": message, "retryable": true})
                } else {
                    json!({"error": message})
                }
            }
        }
    }
}

/// Interpret a finished process's exit status and captured output.
pub fn interpret_output(exit_success: bool, stdout: &str, stderr: &str) -> InvocationResult {
    let stdout = stdout.trim();

    if !exit_success {
        if let Ok(document @ Value::Object(_)) = serde_json::from_str::<Value>(stdout)
            && document.get("error").is_some()
        {
            return InvocationResult::reported(document);
        }

        let stderr = stderr.trim();
        let detail = if stderr.is_empty() {
            "Unknown error"
        } else {
            stderr
        };
        return InvocationResult::failed(format!("Command failed: {}", detail));
    }

    if stdout.is_empty() {
        return InvocationResult::Success(json!({"success": true}));
    }

    match serde_json::from_str::<Value>(stdout) {
        Ok(value) => InvocationResult::Success(value),
        Err(_) => InvocationResult::Success(json!({"raw_output": stdout})),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// How to launch a backend executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the tool-specific arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Working directory, or the server's own when `None`.
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command spec for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
        }
    }

    /// Build from a backend config entry.
    pub fn from_backend(config: &BackendConfig) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            env: config
                .env
                .iter()
                .map(|[k, v]| (k.clone(), v.clone()))
                .collect(),
            working_dir: None,
        }
    }

    /// Add a leading argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Commands for each backend family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backends {
    tasks: CommandSpec,
    memory: CommandSpec,
}

impl Backends {
    /// Create from explicit command specs.
    pub fn new(tasks: CommandSpec, memory: CommandSpec) -> Self {
        Self { tasks, memory }
    }

    /// Build from configuration, applying the invoker's working directory.
    pub fn from_config(backends: &BackendsConfig, invoker: &InvokerConfig) -> Self {
        let resolve = |config: BackendConfig| {
            let spec = CommandSpec::from_backend(&config);
            match invoker.working_dir {
                Some(ref dir) => spec.with_working_dir(dir),
                None => spec,
            }
        };
        Self {
            tasks: resolve(backends.tasks()),
            memory: resolve(backends.memory()),
        }
    }

    /// Command for a backend.
    pub fn get(&self, backend: Backend) -> &CommandSpec {
        match backend {
            Backend::Tasks => &self.tasks,
            Backend::Memory => &self.memory,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invokers
// ─────────────────────────────────────────────────────────────────────────────

/// Runs a backend command and normalizes its outcome.
///
/// Implementations never fail: launch errors, timeouts and non-zero exits
/// are all folded into the returned [`InvocationResult`].
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run `command` with `args` appended after its own arguments.
    async fn run(&self, command: &CommandSpec, args: &[String]) -> InvocationResult;
}

/// Invoker that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    /// Arguments appended to request structured output.
    format_args: Vec<String>,
    /// Per-process timeout.
    timeout: Duration,
}

impl ProcessInvoker {
    /// Create an invoker with the default `--format json` selector and timeout.
    pub fn new() -> Self {
        Self::from_config(&InvokerConfig::default())
    }

    /// Create from configuration.
    pub fn from_config(config: &InvokerConfig) -> Self {
        Self {
            format_args: config.format_args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Set the process timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the structured-output arguments.
    pub fn with_format_args(mut self, args: Vec<String>) -> Self {
        self.format_args = args;
        self
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn run(&self, command: &CommandSpec, args: &[String]) -> InvocationResult {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .args(args)
            .args(&self.format_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(ref dir) = command.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(program = %command.program, ?args, "spawning backend");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %command.program, error = %e, "failed to launch backend");
                return InvocationResult::failed(format!(
                    "Failed to launch '{}': {}",
                    command.program, e
                ));
            }
        };

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return InvocationResult::failed(format!("Command failed: process error: {}", e));
            }
            Err(_) => {
                tracing::warn!(
                    program = %command.program,
                    timeout_secs = self.timeout.as_secs(),
                    "backend timed out"
                );
                return InvocationResult::retryable(format!(
                    "Command timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(program = %command.program, stderr = %stderr.trim(), "backend stderr");
        }

        let result = interpret_output(output.status.success(), &stdout, &stderr);
        if let Some(error) = result.error() {
            tracing::info!(
                program = %command.program,
                exit_code = output.status.code().unwrap_or(-1),
                error,
                "backend reported failure"
            );
        }
        result
    }
}
