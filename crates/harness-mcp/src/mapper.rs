//! Argument mapping from `tools/call` arguments to a backend command line.

use serde_json::{Map, Value};

use crate::error::{McpError, Result};
use crate::registry::{Binding, PropertySchema, PropertyType, ToolDescriptor};

/// Normalize the raw `arguments` field of a tool call into an object.
///
/// Absent and `null` arguments are treated as `{}`; any other non-object
/// value is rejected.
pub fn arguments_object(arguments: Option<Value>) -> Result<Map<String, Value>> {
    match arguments {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(McpError::invalid_params(format!(
            "arguments must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Build the argument vector for `tool` from a call's arguments.
///
/// The result is the tool's subcommand, then positional properties in
/// declaration order, then `--flag value` pairs for optional properties that
/// are present. Properties not in the schema are ignored.
pub fn map_arguments(tool: &ToolDescriptor, arguments: &Map<String, Value>) -> Result<Vec<String>> {
    let mut positional = Vec::new();
    let mut flags = Vec::new();

    for prop in tool.properties {
        let Some(value) = arguments.get(prop.name) else {
            if prop.required {
                return Err(McpError::missing_argument(tool.name.as_str(), prop.name));
            }
            continue;
        };

        let text = render_value(tool, prop, value)?;
        match prop.binding {
            Binding::Positional => positional.push(text),
            Binding::Flag(flag) => {
                flags.push(flag.to_string());
                flags.push(text);
            }
        }
    }

    let mut argv: Vec<String> = tool.subcommand.iter().map(|s| s.to_string()).collect();
    argv.extend(positional);
    argv.extend(flags);
    Ok(argv)
}

/// Check `value` against the property schema and render it as one argument.
fn render_value(tool: &ToolDescriptor, prop: &PropertySchema, value: &Value) -> Result<String> {
    if !prop.ty.matches(value) {
        return Err(McpError::invalid_argument(
            tool.name.as_str(),
            prop.name,
            format!("{}, got {}", prop.ty.as_str(), json_kind(value)),
        ));
    }

    let text = match (prop.ty, value) {
        (PropertyType::String, Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    };

    if !prop.allowed.is_empty() && !prop.allowed.iter().any(|allowed| *allowed == text) {
        return Err(McpError::invalid_argument(
            tool.name.as_str(),
            prop.name,
            format!("one of {}", prop.allowed.join(", ")),
        ));
    }

    Ok(text)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
