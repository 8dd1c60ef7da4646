//! JSON-Schema synthesis from resolved signatures.
//!
//! Output follows the tool wire contract:
//!
//! ```text
//! {type: "object", properties: {...}, required: [...], additionalProperties: false}
//! property = {type, format?, description, items?, properties?, examples?}
//! ```

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use zkmcp_metadata::introspect::collect_fields;
use zkmcp_metadata::type_mapper::{categorize, simple_name, TypeCategory};
use zkmcp_metadata::{ParameterDescriptor, ResolvedSignature, TypeDescriptorProvider};

use crate::describe::{describe_method, describe_parameter};
use crate::tool::ToolDefinition;

/// Default nesting limit for object expansion.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Options for schema synthesis.
#[derive(Debug, Clone, Copy)]
pub struct SchemaOptions {
    /// Maximum object nesting expanded into `properties`. Deeper objects are
    /// emitted as bare `{type: object}`.
    pub max_depth: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Builds input schemas and tool definitions.
pub struct SchemaSynthesizer {
    types: Option<Arc<dyn TypeDescriptorProvider>>,
    options: SchemaOptions,
}

impl SchemaSynthesizer {
    /// Creates a synthesizer. Without a type provider, objects are never expanded.
    pub fn new(types: Option<Arc<dyn TypeDescriptorProvider>>) -> Self {
        Self {
            types,
            options: SchemaOptions::default(),
        }
    }

    /// Overrides the default options.
    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Input schema for a signature.
    ///
    /// `required` is omitted when no parameter is required.
    pub fn build_input_schema(&self, sig: &ResolvedSignature) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &sig.parameters {
            properties.insert(param.name.clone(), self.parameter_schema(param));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        schema.insert("additionalProperties".into(), json!(false));
        Value::Object(schema)
    }

    /// Tool definition for a signature.
    pub fn build_tool(&self, sig: &ResolvedSignature) -> ToolDefinition {
        ToolDefinition {
            name: sig.key(),
            description: describe_method(sig),
            input_schema: self.build_input_schema(sig),
        }
    }

    /// Schema of one parameter. A curated schema override is used verbatim.
    pub fn parameter_schema(&self, param: &ParameterDescriptor) -> Value {
        let description =
            describe_parameter(&param.name, &param.type_name, param.description.as_deref());
        match &param.schema {
            Some(Value::Object(curated)) => {
                let mut schema = curated.clone();
                schema
                    .entry("description")
                    .or_insert_with(|| Value::String(description));
                Value::Object(schema)
            }
            Some(other) => {
                warn!(
                    target: "zkmcp::schema",
                    parameter = %param.name,
                    schema = %other,
                    "curated schema is not an object; synthesizing instead"
                );
                self.type_schema(&param.type_name, Some(description))
            }
            None => self.type_schema(&param.type_name, Some(description)),
        }
    }

    /// Schema of a type with an optional description.
    pub fn type_schema(&self, type_name: &str, description: Option<String>) -> Value {
        let mut visiting = Vec::new();
        Value::Object(self.schema_at(type_name, description, &mut visiting, 0))
    }

    fn schema_at(
        &self,
        type_name: &str,
        description: Option<String>,
        visiting: &mut Vec<String>,
        depth: usize,
    ) -> Map<String, Value> {
        let category = categorize(type_name);
        let mut schema = Map::new();
        schema.insert("type".into(), json!(category.json_kind().as_str()));

        match &category {
            TypeCategory::Primitive(kind) => {
                if let Some(format) = kind.format() {
                    schema.insert("format".into(), json!(format));
                }
                if let Some(d) = description {
                    schema.insert("description".into(), Value::String(d));
                }
                if let Some(example) = kind.example() {
                    schema.insert("examples".into(), Value::Array(vec![example]));
                }
            }
            TypeCategory::Collection { element, .. } | TypeCategory::Array { element } => {
                if let Some(d) = description {
                    schema.insert("description".into(), Value::String(d));
                }
                let items = self.schema_at(element, None, visiting, depth + 1);
                schema.insert("items".into(), Value::Object(items));
            }
            TypeCategory::Map { .. } | TypeCategory::Any => {
                if let Some(d) = description {
                    schema.insert("description".into(), Value::String(d));
                }
            }
            TypeCategory::Object(name) => {
                self.object_body(name, description, &mut schema, visiting, depth);
            }
        }
        schema
    }

    fn object_body(
        &self,
        name: &str,
        description: Option<String>,
        schema: &mut Map<String, Value>,
        visiting: &mut Vec<String>,
        depth: usize,
    ) {
        if visiting.iter().any(|v| v == name) {
            debug!(target: "zkmcp::schema", type_name = %name, "recursive type reference");
            let d = match description {
                Some(d) => format!("{d} (recursive reference)"),
                None => format!("Recursive reference to {}", simple_name(name)),
            };
            schema.insert("description".into(), Value::String(d));
            return;
        }
        if let Some(d) = description {
            schema.insert("description".into(), Value::String(d));
        }
        if depth >= self.options.max_depth {
            debug!(
                target: "zkmcp::schema",
                type_name = %name,
                depth,
                "object nesting limit reached"
            );
            return;
        }
        let Some(types) = &self.types else {
            return;
        };
        let Some(fields) = collect_fields(types.as_ref(), name) else {
            return;
        };
        if fields.is_empty() {
            return;
        }

        visiting.push(name.to_string());
        let mut properties = Map::new();
        for field in &fields {
            let description =
                describe_parameter(&field.name, &field.type_name, field.description.as_deref());
            let field_schema = self.schema_at(&field.type_name, Some(description), visiting, depth + 1);
            properties.insert(field.name.clone(), Value::Object(field_schema));
        }
        visiting.pop();

        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("additionalProperties".into(), json!(false));
    }
}
