//! Conversion of tool definitions into MCP tool models.

use rmcp::model::{Tool, ToolAnnotations};
use serde_json::{json, Map as JsonMap, Value};
use std::sync::Arc;

use zkmcp_discovery::ServiceKey;
use zkmcp_schema::ToolDefinition;

/// Returns an empty object schema for parameterless tools.
///
/// MCP clients expect every tool input schema to carry a JSON Schema "type",
/// so parameterless tools are marked as taking an empty object.
pub(crate) fn empty_schema() -> Arc<JsonMap<String, Value>> {
    let mut schema = JsonMap::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), json!({}));
    schema.insert("additionalProperties".into(), json!(false));
    Arc::new(schema)
}

/// Builds the MCP tool for a definition published by a service.
///
/// The title names the serving version and group so that two versions of
/// one interface stay distinguishable in listings.
pub fn to_mcp_tool(service: &ServiceKey, definition: &ToolDefinition) -> Tool {
    let input_schema = match &definition.input_schema {
        Value::Object(map) => Arc::new(map.clone()),
        _ => empty_schema(),
    };
    Tool {
        name: definition.name.clone().into(),
        title: Some(format!("{} ({service})", definition.name)),
        description: Some(definition.description.clone().into()),
        input_schema,
        output_schema: None,
        annotations: Some(ToolAnnotations::default()),
        icons: None,
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmcp_schema::legacy_tool;

    #[test]
    fn keeps_schema_and_names_service() {
        let key = ServiceKey::new("a.S").with_version("1.0.0");
        let tool = to_mcp_tool(&key, &legacy_tool("a.S", "ping"));
        assert_eq!(tool.name, "a.S.ping");
        assert_eq!(tool.input_schema.get("required"), Some(&json!(["args"])));
        assert!(tool.title.as_deref().unwrap().contains("a.S:1.0.0"));
    }

    #[test]
    fn non_object_schema_becomes_empty_object() {
        let key = ServiceKey::new("a.S");
        let def = ToolDefinition {
            name: "a.S.m".into(),
            description: String::new(),
            input_schema: Value::Null,
        };
        let tool = to_mcp_tool(&key, &def);
        assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
    }
}
