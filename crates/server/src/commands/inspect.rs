//! Handlers for the offline inspection commands: `schema`, `convert`, `parse-path`.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use zkmcp_discovery::{parse_provider_path, ServiceKey};
use zkmcp_schema::ToolDefinition;

use super::{build_bridge, print_json};
use crate::bridge::PreparedCall;
use crate::config::Settings;

/// Tool definitions for one method or a whole interface.
pub(crate) fn schema_tools(
    settings: &Settings,
    interface: &str,
    method: Option<&str>,
) -> Result<Vec<ToolDefinition>> {
    let (bridge, _) = build_bridge(settings)?;
    if let Some(method) = method {
        return Ok(vec![bridge.tool_for(interface, method)]);
    }
    let methods = bridge.methods_for(&ServiceKey::new(interface));
    if methods.is_empty() {
        bail!("no methods known for {interface}; name a method or load a catalog that lists it");
    }
    Ok(methods
        .iter()
        .map(|m| bridge.tool_for(interface, m))
        .collect())
}

/// Handle the `schema` command.
pub(crate) fn handle_schema_command(
    settings: &Settings,
    interface: &str,
    method: Option<&str>,
) -> Result<()> {
    let tools = schema_tools(settings, interface, method)?;
    match tools.as_slice() {
        [single] => print_json(single),
        many => print_json(many),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ConvertOutput {
    #[serde(flatten)]
    call: PreparedCall,
    arguments: Vec<Value>,
}

/// Converts raw JSON arguments for one method.
pub(crate) fn convert_arguments(
    settings: &Settings,
    interface: &str,
    method: &str,
    raw: &str,
) -> Result<ConvertOutput> {
    let parsed: Value = serde_json::from_str(raw).context("arguments are not valid JSON")?;
    let arguments: Map<String, Value> = match parsed {
        Value::Object(map) => map,
        other => return Err(anyhow!("arguments must be a JSON object, got {other}")),
    };
    let (bridge, _) = build_bridge(settings)?;
    let call = bridge.preview_call(interface, method, &arguments);
    Ok(ConvertOutput {
        arguments: call.json_values(),
        call,
    })
}

/// Handle the `convert` command.
pub(crate) fn handle_convert_command(
    settings: &Settings,
    interface: &str,
    method: &str,
    raw: &str,
) -> Result<()> {
    let output = convert_arguments(settings, interface, method, raw)?;
    for issue in &output.call.issues {
        eprintln!(
            "warning: {} forwarded unconverted ({}: {})",
            issue.path, issue.target_type, issue.reason
        );
    }
    print_json(&output)
}

/// Handle the `parse-path` command.
pub(crate) fn handle_parse_path_command(path: &str) -> Result<()> {
    let info = parse_provider_path(path)?;
    print_json(&info)
}
