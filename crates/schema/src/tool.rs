//! Tool definitions as handed to the publisher.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use zkmcp_metadata::signature_key;

use crate::convert::LEGACY_ARGS_KEY;

/// A callable tool: `interface.method`, a description, and an input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// `interface.method`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON-Schema of the call arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Input schema used when no signature could be resolved: a single
/// positional `args` array.
pub fn legacy_args_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            LEGACY_ARGS_KEY: {
                "type": "array",
                "description": "Positional method arguments",
                "items": {}
            }
        },
        "required": [LEGACY_ARGS_KEY],
        "additionalProperties": false
    })
}

/// Tool for a method whose signature is unknown.
pub fn legacy_tool(interface: &str, method: &str) -> ToolDefinition {
    ToolDefinition {
        name: signature_key(interface, method),
        description: format!(
            "Invoke {interface}.{method}. Signature unknown; pass arguments positionally in `args`."
        ),
        input_schema: legacy_args_schema(),
    }
}

/// Splits a tool name into interface and method at the last dot.
pub fn split_tool_name(name: &str) -> Option<(&str, &str)> {
    let (interface, method) = name.rsplit_once('.')?;
    (!interface.is_empty() && !method.is_empty()).then_some((interface, method))
}
