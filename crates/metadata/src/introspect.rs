//! Pluggable structural introspection of types and interfaces.
//!
//! Nothing is discovered at runtime; descriptors are registered up front from
//! catalog files or provider-published service definitions.

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::definition::ServiceDefinition;
use crate::type_mapper::{erase_generics, simple_name};
use crate::types::{FieldDescriptor, InterfaceDescriptor, TypeDescriptor};

/// Source of structural type information.
#[cfg_attr(test, automock)]
pub trait TypeDescriptorProvider: Send + Sync {
    /// Structure of a named type, if known.
    fn load_type(&self, name: &str) -> Option<Arc<TypeDescriptor>>;

    /// Structure of an interface, if known.
    fn load_interface(&self, name: &str) -> Option<Arc<InterfaceDescriptor>>;
}

/// Fields of a type including inherited ones, declared fields first.
///
/// Static fields are skipped and a field redeclared on a subtype hides the
/// parent's. A parent chain that loops back on itself stops at the repeat.
/// Returns `None` when the type itself is unknown.
pub fn collect_fields(
    provider: &dyn TypeDescriptorProvider,
    type_name: &str,
) -> Option<Vec<FieldDescriptor>> {
    let root = provider.load_type(type_name)?;
    let mut seen_types = HashSet::from([root.name.clone()]);
    let mut seen_fields = HashSet::new();
    let mut fields = Vec::new();
    let mut current = Some(root);

    while let Some(ty) = current.take() {
        for field in ty.fields.iter().filter(|f| !f.is_static) {
            if seen_fields.insert(field.name.clone()) {
                fields.push(field.clone());
            }
        }
        let Some(parent) = ty.parent.as_deref() else {
            break;
        };
        if !seen_types.insert(parent.to_string()) {
            warn!(
                target: "zkmcp::metadata",
                type_name = %type_name,
                parent = %parent,
                "type hierarchy loops; stopping inherited field walk"
            );
            break;
        }
        current = provider.load_type(parent);
    }
    Some(fields)
}

#[derive(Debug, Default)]
struct RegistryInner {
    types: HashMap<String, Arc<TypeDescriptor>>,
    // Simple name -> fully-qualified names, for unqualified lookups.
    by_simple_name: HashMap<String, Vec<String>>,
    interfaces: HashMap<String, Arc<InterfaceDescriptor>>,
}

/// In-memory type provider populated at startup.
///
/// Unqualified lookups (`User`) resolve when exactly one registered type has
/// that simple name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a type.
    pub fn register_type(&self, descriptor: TypeDescriptor) {
        let mut inner = self.inner.write();
        let name = descriptor.name.clone();
        let simple = simple_name(&name);
        let names = inner.by_simple_name.entry(simple).or_default();
        if !names.contains(&name) {
            names.push(name.clone());
        }
        inner.types.insert(name, Arc::new(descriptor));
    }

    /// Registers or replaces an interface.
    pub fn register_interface(&self, descriptor: InterfaceDescriptor) {
        self.inner
            .write()
            .interfaces
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Registers the interface and every type a service definition carries.
    pub fn register_definition(&self, definition: &ServiceDefinition) {
        for ty in definition.type_descriptors() {
            self.register_type(ty);
        }
        if let Some(interface) = definition.interface_descriptor() {
            self.register_interface(interface);
        }
    }

    /// Number of registered types and interfaces.
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.types.len(), inner.interfaces.len())
    }
}

impl TypeDescriptorProvider for TypeRegistry {
    fn load_type(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let erased = erase_generics(name);
        let inner = self.inner.read();
        if let Some(found) = inner.types.get(erased) {
            return Some(Arc::clone(found));
        }
        if erased.contains('.') {
            return None;
        }
        match inner.by_simple_name.get(erased).map(Vec::as_slice) {
            Some([only]) => inner.types.get(only).cloned(),
            _ => None,
        }
    }

    fn load_interface(&self, name: &str) -> Option<Arc<InterfaceDescriptor>> {
        self.inner.read().interfaces.get(name.trim()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_types() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry.register_type(TypeDescriptor::new(
            "com.example.model.BaseEntity",
            vec![
                FieldDescriptor::new("id", "java.lang.Long"),
                FieldDescriptor::new("createdAt", "java.util.Date"),
            ],
        ));
        let mut serial = FieldDescriptor::new("serialVersionUID", "long");
        serial.is_static = true;
        registry.register_type(
            TypeDescriptor::new(
                "com.example.model.User",
                vec![
                    serial,
                    FieldDescriptor::new("name", "java.lang.String"),
                    FieldDescriptor::new("id", "long"),
                ],
            )
            .with_parent("com.example.model.BaseEntity"),
        );
        registry
    }

    #[test]
    fn inherited_fields_follow_declared_and_skip_statics() {
        let registry = user_types();
        let fields = collect_fields(&registry, "com.example.model.User").unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "id", "createdAt"]);
        // subtype declaration wins
        assert_eq!(fields[1].type_name, "long");
    }

    #[test]
    fn unknown_type_has_no_fields() {
        assert!(collect_fields(&user_types(), "com.example.Missing").is_none());
    }

    #[test]
    fn looping_hierarchy_terminates() {
        let registry = TypeRegistry::new();
        registry.register_type(
            TypeDescriptor::new("a.A", vec![FieldDescriptor::new("x", "int")]).with_parent("a.B"),
        );
        registry.register_type(
            TypeDescriptor::new("a.B", vec![FieldDescriptor::new("y", "int")]).with_parent("a.A"),
        );
        let fields = collect_fields(&registry, "a.A").unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn simple_name_lookup_requires_unique_match() {
        let registry = user_types();
        assert!(registry.load_type("User").is_some());
        registry.register_type(TypeDescriptor::new("com.other.User", vec![]));
        assert!(registry.load_type("User").is_none());
        assert!(registry.load_type("com.other.User").is_some());
    }

    #[test]
    fn generic_names_are_erased_for_lookup() {
        let registry = user_types();
        assert!(registry.load_type("com.example.model.User<T>").is_some());
    }

    #[test]
    fn mocked_provider_drives_field_walk() {
        let mut provider = MockTypeDescriptorProvider::new();
        provider
            .expect_load_type()
            .times(1)
            .returning(|_| {
                Some(Arc::new(TypeDescriptor::new(
                    "a.Leaf",
                    vec![FieldDescriptor::new("v", "int")],
                )))
            });
        let fields = collect_fields(&provider, "a.Leaf").unwrap();
        assert_eq!(fields[0].name, "v");
    }
}
