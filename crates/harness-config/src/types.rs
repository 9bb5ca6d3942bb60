//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]             # identity reported by `initialize`
//! [invoker]            # timeout and structured-output flag
//! [backends.tasks]     # executable behind the task_* tools
//! [backends.memory]    # executable behind the memory_* tools
//! [logging]            # log level and file output
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default server name reported in `serverInfo`.
pub const DEFAULT_SERVER_NAME: &str = "agent-harness-tools";

/// Default server version reported in `serverInfo`.
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Interpreter used by the default backends.
const DEFAULT_INTERPRETER: &str = "python3";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Use the accessor methods to read a
/// section with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Server identity and routing policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Process invocation settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoker: Option<InvokerConfig>,

    /// Backend executables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<BackendsConfig>,

    /// Logging configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl HarnessConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        let config: HarnessConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: HarnessConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.invoker.is_some() {
            self.invoker = other.invoker;
        }

        if let Some(over) = other.backends {
            match self.backends {
                Some(ref mut base) => base.merge(over),
                None => self.backends = Some(over),
            }
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Server section with defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Invoker section with defaults.
    pub fn invoker(&self) -> InvokerConfig {
        self.invoker.clone().unwrap_or_default()
    }

    /// Backends section with defaults.
    pub fn backends(&self) -> BackendsConfig {
        self.backends.clone().unwrap_or_default()
    }

    /// Logging section with defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Reject values that would only fail later at invocation time.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(ref invoker) = self.invoker
            && invoker.timeout_secs == 0
        {
            return Err(crate::ConfigError::InvalidValue {
                field: "invoker.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(ref backends) = self.backends {
            for (name, backend) in [("tasks", &backends.tasks), ("memory", &backends.memory)] {
                if let Some(backend) = backend
                    && backend.command.trim().is_empty()
                {
                    return Err(crate::ConfigError::InvalidValue {
                        field: format!("backends.{}.command", name),
                        reason: "must not be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// How the protocol loop treats methods it does not implement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownMethodPolicy {
    /// Drop the request without writing a response.
    #[default]
    Ignore,
    /// Reply with a JSON-RPC method-not-found error.
    Error,
}

/// Server configuration.
///
/// ```toml
/// [server]
/// name = "agent-harness-tools"
/// version = "1.0.0"
/// unknown_methods = "ignore"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    pub name: String,
    /// Version reported in `serverInfo`.
    pub version: String,
    /// Handling of unrecognized methods.
    pub unknown_methods: UnknownMethodPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            version: DEFAULT_SERVER_VERSION.to_string(),
            unknown_methods: UnknownMethodPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoker
// ─────────────────────────────────────────────────────────────────────────────

/// Process invocation settings.
///
/// ```toml
/// [invoker]
/// timeout_secs = 120
/// format_args = ["--format", "json"]
/// working_dir = "/path/to/project"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Seconds a backend process may run before it is killed.
    pub timeout_secs: u64,
    /// Arguments appended to every invocation to request structured output.
    pub format_args: Vec<String>,
    /// Working directory for backend processes. Defaults to the server's cwd.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            format_args: vec!["--format".to_string(), "json".to_string()],
            working_dir: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// Executables backing the tool families.
///
/// ```toml
/// [backends.tasks]
/// command = "python3"
/// args = ["scripts/tasks.py"]
///
/// [backends.memory]
/// command = "/usr/local/bin/memory"
/// env = [["MEMORY_DIR", "/var/lib/memory"]]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Backend for the `task_*` tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<BackendConfig>,
    /// Backend for the `memory_*` tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<BackendConfig>,
}

impl BackendsConfig {
    /// Merge another backends table on top of this one, per backend.
    pub fn merge(&mut self, other: BackendsConfig) {
        if other.tasks.is_some() {
            self.tasks = other.tasks;
        }
        if other.memory.is_some() {
            self.memory = other.memory;
        }
    }

    /// Tasks backend, falling back to `python3 scripts/tasks.py`.
    pub fn tasks(&self) -> BackendConfig {
        self.tasks
            .clone()
            .unwrap_or_else(|| BackendConfig::python_script("scripts/tasks.py"))
    }

    /// Memory backend, falling back to `python3 scripts/memory.py`.
    pub fn memory(&self) -> BackendConfig {
        self.memory
            .clone()
            .unwrap_or_else(|| BackendConfig::python_script("scripts/memory.py"))
    }
}

/// A single backend executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Program to execute.
    pub command: String,
    /// Arguments placed before the tool-specific arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables to set (as [key, value] pairs).
    #[serde(default)]
    pub env: Vec<[String; 2]>,
}

impl BackendConfig {
    /// Create a backend that runs `command` with no extra arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// A backend that runs a script under the default interpreter.
    pub fn python_script(script: impl Into<String>) -> Self {
        Self::new(DEFAULT_INTERPRETER).with_arg(script)
    }

    /// Add a leading argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push([key.into(), value.into()]);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "debug"
/// file = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter directive (e.g. `"info"`, `"harness_mcp=debug"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Whether to write rolling JSON log files.
    pub file: bool,
    /// Directory for log files. Defaults to `<config dir>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            file: true,
            dir: None,
        }
    }
}
