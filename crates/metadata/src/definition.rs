//! Provider-published service definitions.
//!
//! Providers publish a JSON document describing their interface:
//!
//! ```json
//! {
//!   "canonicalName": "com.example.UserService",
//!   "methods": [
//!     {"name": "getUserById", "parameterTypes": ["java.lang.Long"],
//!      "parameterNames": ["userId"], "returnType": "com.example.User"}
//!   ],
//!   "types": [
//!     {"type": "com.example.User", "properties": {"id": "java.lang.Long"}}
//!   ]
//! }
//! ```
//!
//! Property values may be a bare type string or an object with a `type` key.

use serde::Deserialize;
use serde_json::Value;

use crate::type_mapper::{categorize, TypeCategory};
use crate::types::{
    DeclaredParameter, FieldDescriptor, InterfaceDescriptor, MethodDefinition, TypeDescriptor,
};

/// One method entry of a service definition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionMethod {
    /// Method name.
    pub name: String,
    /// Parameter types in declaration order.
    #[serde(default)]
    pub parameter_types: Vec<String>,
    /// Parameter names, when the provider compiled with them.
    #[serde(default)]
    pub parameter_names: Vec<String>,
    /// Declared return type.
    #[serde(default)]
    pub return_type: Option<String>,
}

/// One type entry of a service definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionType {
    /// Fully-qualified type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Field name to type string or `{ "type": ... }`.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    /// Parent type, if the definition records one.
    #[serde(default)]
    pub parent: Option<String>,
}

/// A provider-published service definition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// Interface name. Some publishers use `interface` instead.
    #[serde(default, alias = "interface")]
    pub canonical_name: Option<String>,
    /// Declared methods.
    #[serde(default)]
    pub methods: Vec<DefinitionMethod>,
    /// Structured types referenced by the methods.
    #[serde(default)]
    pub types: Vec<DefinitionType>,
}

impl ServiceDefinition {
    /// Parses a definition document.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Interface descriptor, when the definition names its interface.
    pub fn interface_descriptor(&self) -> Option<InterfaceDescriptor> {
        let name = self.canonical_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        let methods = self
            .methods
            .iter()
            .filter(|m| !m.name.is_empty())
            .map(|m| MethodDefinition {
                name: m.name.clone(),
                parameters: m
                    .parameter_types
                    .iter()
                    .enumerate()
                    .map(|(idx, ty)| DeclaredParameter {
                        name: m
                            .parameter_names
                            .get(idx)
                            .filter(|n| !n.trim().is_empty())
                            .cloned(),
                        type_name: ty.clone(),
                    })
                    .collect(),
                return_type: m.return_type.clone(),
            })
            .collect();
        Some(InterfaceDescriptor {
            name: name.to_string(),
            methods,
        })
    }

    /// Structured types described by the definition. Primitive and
    /// collection entries carry no fields and are skipped.
    pub fn type_descriptors(&self) -> Vec<TypeDescriptor> {
        self.types
            .iter()
            .filter(|t| matches!(categorize(&t.type_name), TypeCategory::Object(_)))
            .map(|t| TypeDescriptor {
                name: t.type_name.clone(),
                parent: t.parent.clone(),
                fields: t
                    .properties
                    .iter()
                    .filter_map(|(name, value)| {
                        let type_name = match value {
                            Value::String(s) => s.clone(),
                            Value::Object(obj) => obj.get("type")?.as_str()?.to_string(),
                            _ => return None,
                        };
                        Some(FieldDescriptor::new(name.clone(), type_name))
                    })
                    .collect(),
            })
            .collect()
    }
}
