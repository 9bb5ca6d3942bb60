//! Static tool catalog.
//!
//! Every tool the server exposes is declared here together with its argument
//! schema, the backend that executes it, and the rule for turning arguments
//! into a command line. The set is closed: adding a tool means adding a
//! [`ToolName`] variant and a [`ToolDescriptor`] entry.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::error::{McpError, Result};
use crate::protocol::ToolInfo;

// ─────────────────────────────────────────────────────────────────────────────
// Names and backends
// ─────────────────────────────────────────────────────────────────────────────

/// Names of all registered tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    TaskCreate,
    TaskList,
    TaskUpdate,
    TaskShow,
    TaskContext,
    TaskNext,
    TaskArchive,
    MemoryCreate,
    MemoryList,
    MemoryRead,
}

impl ToolName {
    /// All tools, in catalog order.
    pub const ALL: [ToolName; 10] = [
        Self::TaskCreate,
        Self::TaskList,
        Self::TaskUpdate,
        Self::TaskShow,
        Self::TaskContext,
        Self::TaskNext,
        Self::TaskArchive,
        Self::MemoryCreate,
        Self::MemoryList,
        Self::MemoryRead,
    ];

    /// Wire name of the tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreate => "task_create",
            Self::TaskList => "task_list",
            Self::TaskUpdate => "task_update",
            Self::TaskShow => "task_show",
            Self::TaskContext => "task_context",
            Self::TaskNext => "task_next",
            Self::TaskArchive => "task_archive",
            Self::MemoryCreate => "memory_create",
            Self::MemoryList => "memory_list",
            Self::MemoryRead => "memory_read",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| McpError::unknown_tool(s))
    }
}

/// The external executable family a tool is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Task tracking backend (`task_*`).
    Tasks,
    /// Long-term memory backend (`memory_*`).
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tasks => f.write_str("tasks"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schemas
// ─────────────────────────────────────────────────────────────────────────────

/// JSON type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
}

impl PropertyType {
    /// JSON Schema type keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }

    /// Whether `value` has this type. No coercion: `3` is not a string.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
        }
    }
}

/// Where a property lands on the backend command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Next positional slot, in declaration order.
    Positional,
    /// A `--flag value` pair.
    Flag(&'static str),
}

/// Schema for one argument property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySchema {
    pub name: &'static str,
    pub ty: PropertyType,
    pub allowed: &'static [&'static str],
    pub required: bool,
    pub binding: Binding,
}

impl PropertySchema {
    /// A required string bound to the next positional slot.
    pub const fn positional(name: &'static str) -> Self {
        Self {
            name,
            ty: PropertyType::String,
            allowed: &[],
            required: true,
            binding: Binding::Positional,
        }
    }

    /// An optional string passed as `flag value`.
    pub const fn flag(name: &'static str, flag: &'static str) -> Self {
        Self {
            name,
            ty: PropertyType::String,
            allowed: &[],
            required: false,
            binding: Binding::Flag(flag),
        }
    }

    /// Restrict the property to a fixed set of values.
    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    /// JSON Schema fragment for this property.
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.ty.as_str()));
        if !self.allowed.is_empty() {
            schema.insert("enum".to_string(), json!(self.allowed));
        }
        Value::Object(schema)
    }
}

const TASK_CATEGORIES: &[&str] = &[
    "foundation",
    "infrastructure",
    "domain",
    "presentation",
    "migration",
    "features",
    "testing",
    "review",
    "security",
    "research",
];

const TASK_PRIORITIES: &[&str] = &["low", "medium", "high"];

/// Immutable description of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub backend: Backend,
    /// Arguments that always precede the mapped ones (the backend subcommand).
    pub subcommand: &'static [&'static str],
    pub properties: &'static [PropertySchema],
}

impl ToolDescriptor {
    /// Names of the required properties, in declaration order.
    pub fn required(&self) -> Vec<&'static str> {
        self.properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect()
    }

    /// JSON Schema for the tool's input object.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|p| (p.name.to_string(), p.to_schema()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        let required = self.required();
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        Value::Object(schema)
    }

    /// Descriptor as advertised by `tools/list`.
    pub fn to_info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

const CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: ToolName::TaskCreate,
        description: "Create a new development task.",
        backend: Backend::Tasks,
        subcommand: &["create"],
        properties: &[
            PropertySchema::positional("category").one_of(TASK_CATEGORIES),
            PropertySchema::positional("title"),
            PropertySchema::flag("description", "--desc"),
            PropertySchema::flag("priority", "--priority").one_of(TASK_PRIORITIES),
            PropertySchema::flag("dependencies", "--dependencies"),
        ],
    },
    ToolDescriptor {
        name: ToolName::TaskList,
        description: "List existing tasks.",
        backend: Backend::Tasks,
        subcommand: &["list"],
        properties: &[
            PropertySchema::flag("status", "--status"),
            PropertySchema::flag("category", "--category"),
        ],
    },
    ToolDescriptor {
        name: ToolName::TaskUpdate,
        description: "Update task status.",
        backend: Backend::Tasks,
        subcommand: &["update"],
        properties: &[
            PropertySchema::positional("task_id"),
            PropertySchema::positional("status"),
        ],
    },
    ToolDescriptor {
        name: ToolName::TaskShow,
        description: "Show task details.",
        backend: Backend::Tasks,
        subcommand: &["show"],
        properties: &[PropertySchema::positional("task_id")],
    },
    ToolDescriptor {
        name: ToolName::TaskContext,
        description: "Show currently active tasks (in_progress).",
        backend: Backend::Tasks,
        subcommand: &["context"],
        properties: &[],
    },
    ToolDescriptor {
        name: ToolName::TaskNext,
        description: "Suggest next task to work on.",
        backend: Backend::Tasks,
        subcommand: &["next"],
        properties: &[],
    },
    ToolDescriptor {
        name: ToolName::TaskArchive,
        description: "Archive a task.",
        backend: Backend::Tasks,
        subcommand: &["archive"],
        properties: &[PropertySchema::positional("task_id")],
    },
    ToolDescriptor {
        name: ToolName::MemoryCreate,
        description: "Create a long-term memory.",
        backend: Backend::Memory,
        subcommand: &["create"],
        properties: &[
            PropertySchema::positional("title"),
            PropertySchema::positional("content"),
            PropertySchema::flag("tags", "--tags"),
        ],
    },
    ToolDescriptor {
        name: ToolName::MemoryList,
        description: "List memories.",
        backend: Backend::Memory,
        subcommand: &["list"],
        properties: &[PropertySchema::flag("tag", "--tag")],
    },
    ToolDescriptor {
        name: ToolName::MemoryRead,
        description: "Read a memory.",
        backend: Backend::Memory,
        subcommand: &["read"],
        properties: &[PropertySchema::positional("filename")],
    },
];

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only tool catalog, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct Registry {
    tools: &'static [ToolDescriptor],
}

impl Registry {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self { tools: CATALOG }
    }

    /// All descriptors, in catalog order.
    pub fn tools(&self) -> &[ToolDescriptor] {
        self.tools
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by wire name.
    pub fn get(&self, name: &str) -> Result<&ToolDescriptor> {
        let tool: ToolName = name.parse()?;
        self.tools
            .iter()
            .find(|d| d.name == tool)
            .ok_or_else(|| McpError::unknown_tool(name))
    }

    /// Descriptors as advertised by `tools/list`.
    pub fn tool_infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(ToolDescriptor::to_info).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
