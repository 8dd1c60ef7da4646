use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

fn default_true() -> bool {
    true
}

/// Cache key and tool name for a method: `interface.method`.
pub fn signature_key(interface: &str, method: &str) -> String {
    format!("{interface}.{method}")
}

/// One declared parameter of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name as exposed to callers.
    pub name: String,
    /// Fully-qualified type identifier, generics included.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Zero-based call position. Authoritative for invocation order.
    pub order: usize,
    /// Curated description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether callers must supply the parameter.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Curated JSON-Schema fragment used verbatim for this parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ParameterDescriptor {
    /// Creates a required parameter with no curated extras.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, order: usize) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            order,
            description: None,
            required: true,
            schema: None,
        }
    }

    /// Sets the curated description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Curated method row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name.
    pub name: String,
    /// Declared return type.
    #[serde(default, alias = "returnType", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Curated description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which resolution tier produced a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureSource {
    /// Exact structural metadata from a type provider.
    Introspection,
    /// Curated rows from the metadata store.
    PersistedMetadata,
    /// Guessed from the method name.
    Heuristic,
}

impl fmt::Display for SignatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureSource::Introspection => "introspection",
            SignatureSource::PersistedMetadata => "persisted_metadata",
            SignatureSource::Heuristic => "heuristic",
        })
    }
}

/// Ordered, typed parameter list for one method, however it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSignature {
    /// Interface the method belongs to.
    pub interface: String,
    /// Method name.
    pub method: String,
    /// Parameters sorted by `order`.
    pub parameters: Vec<ParameterDescriptor>,
    /// Declared return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Method description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tier that produced this signature.
    pub source: SignatureSource,
}

impl ResolvedSignature {
    /// Creates a signature, sorting parameters by `order`.
    pub fn new(
        interface: impl Into<String>,
        method: impl Into<String>,
        mut parameters: Vec<ParameterDescriptor>,
        source: SignatureSource,
    ) -> Self {
        parameters.sort_by_key(|p| p.order);
        Self {
            interface: interface.into(),
            method: method.into(),
            parameters,
            return_type: None,
            description: None,
            source,
        }
    }

    /// `interface.method`.
    pub fn key(&self) -> String {
        signature_key(&self.interface, &self.method)
    }

    /// Parameter types in call order.
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.type_name.clone()).collect()
    }

    /// Looks up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// One field of a structured type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field type identifier.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Static fields are never part of the wire shape.
    #[serde(default, rename = "static", skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    /// Curated field description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Creates an instance field.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_static: false,
            description: None,
        }
    }
}

/// Structure of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Fully-qualified type name.
    pub name: String,
    /// Parent type whose fields are inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Fields declared directly on this type.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Creates a type with the given declared fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields,
        }
    }

    /// Sets the parent type.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// One declared parameter in an interface definition. Names may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredParameter {
    /// Declared name, if the definition carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type identifier.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One method of an interface definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDefinition {
    /// Method name. Overloads share a name.
    pub name: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<DeclaredParameter>,
    /// Declared return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

/// Structure of an RPC interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    /// Fully-qualified interface name.
    pub name: String,
    /// Methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
}

impl InterfaceDescriptor {
    /// First declared method with this name.
    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.name == name)
    }
}
