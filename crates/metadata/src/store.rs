//! Read-only access to curated service, method, and parameter rows.

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::types::{MethodDescriptor, ParameterDescriptor};

/// Failures of the backing store. Absence of a row is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    /// The query did not finish in time.
    #[error("metadata store query timed out after {0:?}")]
    Timeout(Duration),
}

/// Curated service row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRow {
    /// Row id.
    pub id: u64,
    /// Interface name.
    pub interface: String,
    /// Curated version, if any.
    pub version: Option<String>,
    /// Curated description, if any.
    pub description: Option<String>,
}

/// Curated method row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRow {
    /// Row id.
    pub id: u64,
    /// Owning service row.
    pub service_id: u64,
    /// Method details.
    pub method: MethodDescriptor,
}

/// Lookups against persisted metadata.
#[cfg_attr(test, automock)]
pub trait MetadataStore: Send + Sync {
    /// Service row for an interface.
    fn find_service(&self, interface: &str) -> Result<Option<ServiceRow>, StoreError>;

    /// Method row by service and method name.
    fn find_method(&self, service_id: u64, method: &str) -> Result<Option<MethodRow>, StoreError>;

    /// Parameters of a method, sorted by `order`.
    fn find_parameters(&self, method_id: u64) -> Result<Vec<ParameterDescriptor>, StoreError>;

    /// All method rows of a service.
    fn list_methods(&self, service_id: u64) -> Result<Vec<MethodRow>, StoreError>;
}

#[derive(Debug, Default)]
struct MemInner {
    services: HashMap<u64, ServiceRow>,
    by_interface: HashMap<String, u64>,
    methods: HashMap<u64, MethodRow>,
    parameters: HashMap<u64, Vec<ParameterDescriptor>>,
    next_id: u64,
}

/// In-memory metadata store.
#[derive(Debug, Default)]
pub struct MemMetadataStore {
    inner: RwLock<MemInner>,
}

impl MemMetadataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a service row, or updates version and description of an
    /// existing one. Returns the row id.
    pub fn upsert_service(
        &self,
        interface: &str,
        version: Option<String>,
        description: Option<String>,
    ) -> u64 {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_interface.get(interface) {
            if let Some(row) = inner.services.get_mut(&id) {
                if version.is_some() {
                    row.version = version;
                }
                if description.is_some() {
                    row.description = description;
                }
            }
            return id;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.services.insert(
            id,
            ServiceRow {
                id,
                interface: interface.to_string(),
                version,
                description,
            },
        );
        inner.by_interface.insert(interface.to_string(), id);
        id
    }

    /// Inserts or replaces a method and its parameters. Returns the method id.
    pub fn upsert_method(
        &self,
        service_id: u64,
        method: MethodDescriptor,
        mut parameters: Vec<ParameterDescriptor>,
    ) -> u64 {
        parameters.sort_by_key(|p| p.order);
        let mut inner = self.inner.write();
        let existing = inner
            .methods
            .values()
            .find(|row| row.service_id == service_id && row.method.name == method.name)
            .map(|row| row.id);
        let id = match existing {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        inner.methods.insert(
            id,
            MethodRow {
                id,
                service_id,
                method,
            },
        );
        inner.parameters.insert(id, parameters);
        id
    }

    /// Number of service and method rows.
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.services.len(), inner.methods.len())
    }
}

impl MetadataStore for MemMetadataStore {
    fn find_service(&self, interface: &str) -> Result<Option<ServiceRow>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .by_interface
            .get(interface)
            .and_then(|id| inner.services.get(id))
            .cloned())
    }

    fn find_method(&self, service_id: u64, method: &str) -> Result<Option<MethodRow>, StoreError> {
        Ok(self
            .inner
            .read()
            .methods
            .values()
            .find(|row| row.service_id == service_id && row.method.name == method)
            .cloned())
    }

    fn find_parameters(&self, method_id: u64) -> Result<Vec<ParameterDescriptor>, StoreError> {
        Ok(self
            .inner
            .read()
            .parameters
            .get(&method_id)
            .cloned()
            .unwrap_or_default())
    }

    fn list_methods(&self, service_id: u64) -> Result<Vec<MethodRow>, StoreError> {
        let mut rows: Vec<_> = self
            .inner
            .read()
            .methods
            .values()
            .filter(|row| row.service_id == service_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.method.name.cmp(&b.method.name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor {
            name: name.into(),
            return_type: None,
            description: None,
        }
    }

    #[test]
    fn parameters_come_back_sorted() {
        let store = MemMetadataStore::new();
        let svc = store.upsert_service("a.B", None, None);
        let m = store.upsert_method(
            svc,
            method("m"),
            vec![
                ParameterDescriptor::new("b", "int", 1),
                ParameterDescriptor::new("a", "int", 0),
            ],
        );
        let params = store.find_parameters(m).unwrap();
        assert_eq!(params[0].name, "a");
        assert_eq!(params[1].name, "b");
    }

    #[test]
    fn upserts_are_idempotent_by_name() {
        let store = MemMetadataStore::new();
        let svc = store.upsert_service("a.B", None, None);
        assert_eq!(store.upsert_service("a.B", Some("1".into()), None), svc);
        let first = store.upsert_method(svc, method("m"), vec![]);
        let second = store.upsert_method(svc, method("m"), vec![]);
        assert_eq!(first, second);
        assert_eq!(store.stats(), (1, 1));
        assert_eq!(
            store.find_service("a.B").unwrap().unwrap().version.as_deref(),
            Some("1")
        );
    }

    #[test]
    fn absence_is_not_an_error() {
        let store = MemMetadataStore::new();
        assert_eq!(store.find_service("x.Y").unwrap(), None);
        assert_eq!(store.find_method(7, "m").unwrap(), None);
        assert!(store.find_parameters(7).unwrap().is_empty());
    }
}
