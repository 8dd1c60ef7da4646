//! Startup catalog: curated rows, type structures, and entity hints in one
//! JSON document.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::definition::ServiceDefinition;
use crate::heuristic::EntityTypes;
use crate::introspect::TypeRegistry;
use crate::store::MemMetadataStore;
use crate::types::{InterfaceDescriptor, MethodDescriptor, ParameterDescriptor, TypeDescriptor};

/// Curated method with its parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMethod {
    /// Method row.
    #[serde(flatten)]
    pub method: MethodDescriptor,
    /// Parameter rows.
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

/// Curated service with its methods.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogService {
    /// Interface name.
    pub interface: String,
    /// Curated version.
    #[serde(default)]
    pub version: Option<String>,
    /// Curated description.
    #[serde(default)]
    pub description: Option<String>,
    /// Curated methods.
    #[serde(default)]
    pub methods: Vec<CatalogMethod>,
}

/// Everything the bridge can learn about services before any provider shows up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataCatalog {
    /// Curated service rows.
    #[serde(default)]
    pub services: Vec<CatalogService>,
    /// Structured type descriptors.
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
    /// Interface descriptors.
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescriptor>,
    /// Provider-published service definitions.
    #[serde(default)]
    pub definitions: Vec<ServiceDefinition>,
    /// Entity name to type hints for the heuristic tier.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

/// Counts of what a catalog contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Service rows.
    pub services: usize,
    /// Method rows.
    pub methods: usize,
    /// Types registered, including those from definitions.
    pub types: usize,
    /// Interfaces registered, including those from definitions.
    pub interfaces: usize,
}

impl MetadataCatalog {
    /// Parses a catalog document.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Appends another catalog's contents; later entity hints win.
    pub fn merge(&mut self, other: MetadataCatalog) {
        self.services.extend(other.services);
        self.types.extend(other.types);
        self.interfaces.extend(other.interfaces);
        self.definitions.extend(other.definitions);
        self.entities.extend(other.entities);
    }

    /// Loads rows into the store and structures into the registry.
    pub fn load_into(&self, store: &MemMetadataStore, registry: &TypeRegistry) -> CatalogStats {
        let mut stats = CatalogStats::default();
        for service in &self.services {
            let id = store.upsert_service(
                &service.interface,
                service.version.clone(),
                service.description.clone(),
            );
            stats.services += 1;
            for m in &service.methods {
                store.upsert_method(id, m.method.clone(), m.parameters.clone());
                stats.methods += 1;
            }
        }
        for ty in &self.types {
            registry.register_type(ty.clone());
            stats.types += 1;
        }
        for iface in &self.interfaces {
            registry.register_interface(iface.clone());
            stats.interfaces += 1;
        }
        for def in &self.definitions {
            stats.types += def.type_descriptors().len();
            if def.interface_descriptor().is_some() {
                stats.interfaces += 1;
            }
            registry.register_definition(def);
        }
        stats
    }

    /// Entity hints for the heuristic tier.
    pub fn entity_types(&self) -> EntityTypes {
        self.entities.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::TypeDescriptorProvider;
    use crate::store::MetadataStore;

    const CATALOG: &str = r#"{
        "services": [{
            "interface": "com.example.UserService",
            "version": "1.0.0",
            "methods": [{
                "name": "getUserById",
                "returnType": "com.example.model.User",
                "description": "Fetch a user",
                "parameters": [{"name": "userId", "type": "java.lang.Long", "order": 0}]
            }]
        }],
        "types": [{"name": "com.example.model.User", "fields": [{"name": "id", "type": "long"}]}],
        "definitions": [{"canonicalName": "com.example.OrderService",
                         "methods": [{"name": "getOrder", "parameterTypes": ["long"]}]}],
        "entities": {"User": "com.example.model.User"}
    }"#;

    #[test]
    fn loads_rows_types_and_definitions() {
        let catalog = MetadataCatalog::from_json(CATALOG).unwrap();
        let store = MemMetadataStore::new();
        let registry = TypeRegistry::new();
        let stats = catalog.load_into(&store, &registry);
        assert_eq!(stats.services, 1);
        assert_eq!(stats.methods, 1);
        assert_eq!(stats.types, 1);
        assert_eq!(stats.interfaces, 1);

        let svc = store.find_service("com.example.UserService").unwrap().unwrap();
        let row = store.find_method(svc.id, "getUserById").unwrap().unwrap();
        assert_eq!(row.method.return_type.as_deref(), Some("com.example.model.User"));
        assert!(registry.load_interface("com.example.OrderService").is_some());
        assert_eq!(
            catalog.entity_types().get("user"),
            Some("com.example.model.User")
        );
    }

    #[test]
    fn merge_appends() {
        let mut a = MetadataCatalog::from_json(CATALOG).unwrap();
        let b = MetadataCatalog::from_json(r#"{"entities": {"user": "x.User"}}"#).unwrap();
        a.merge(b);
        assert_eq!(a.services.len(), 1);
        assert_eq!(a.entity_types().get("User"), Some("x.User"));
    }
}
