//! Shared test fixtures for zkmcp crates.
//!
//! Provides environment guards for tests that touch process-global state and
//! a sample service catalog (users, orders, products, and a self-referential
//! tree type) used by integration tests across the workspace.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use zkmcp_discovery::{ProviderEvent, ProviderInfo, ServiceKey};
use zkmcp_metadata::{EntityTypes, MemMetadataStore, MetadataCatalog, TypeRegistry};

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
pub fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Restores an environment variable on drop.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

/// Sets (or removes, for `None`) an environment variable until the guard drops.
///
/// ```
/// let _guard = zkmcp_test_utils::set_env_var("ZKMCP_DOC_VAR", Some("value"));
/// assert_eq!(std::env::var("ZKMCP_DOC_VAR").unwrap(), "value");
/// ```
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    match value {
        Some(v) => std::env::set_var(key, v),
        None => std::env::remove_var(key),
    }
    EnvVarGuard { key, previous }
}

/// Interface of the sample user service.
pub const USER_SERVICE: &str = "com.example.service.UserService";
/// Interface of the sample order service.
pub const ORDER_SERVICE: &str = "com.example.service.OrderService";
/// Interface of the sample catalog (tree) service.
pub const CATEGORY_SERVICE: &str = "com.example.service.CategoryService";

/// Sample catalog document.
///
/// - `UserService`: curated `getUserById`, introspected `findUsers` and
///   `updateUser`, heuristic-only `getAllUsers`.
/// - `OrderService`: introspected `createOrder(Order)` where `Order` carries
///   a `List<OrderItem>` and a `Set<String>` of tags.
/// - `CategoryService`: `saveCategory(Category)` where `Category` refers to
///   itself through `parent` and `children`.
pub const SAMPLE_CATALOG: &str = r#"{
  "services": [
    {
      "interface": "com.example.service.UserService",
      "version": "1.0.0",
      "methods": [
        {
          "name": "getUserById",
          "returnType": "com.example.model.User",
          "description": "Look up one user by primary key",
          "parameters": [
            {"name": "userId", "type": "java.lang.Long", "order": 0, "description": "Primary key of the user"}
          ]
        },
        {
          "name": "findUsers",
          "parameters": [
            {"name": "keyword", "type": "java.lang.String", "order": 0, "description": "Name fragment"},
            {"name": "limit", "type": "int", "order": 1, "required": false}
          ]
        }
      ]
    }
  ],
  "types": [
    {"name": "com.example.model.BaseEntity",
     "fields": [{"name": "id", "type": "java.lang.Long"}, {"name": "createdAt", "type": "java.util.Date"}]},
    {"name": "com.example.model.User", "parent": "com.example.model.BaseEntity",
     "fields": [
       {"name": "serialVersionUID", "type": "long", "static": true},
       {"name": "userName", "type": "java.lang.String"},
       {"name": "age", "type": "java.lang.Integer"},
       {"name": "vip", "type": "boolean"}
     ]},
    {"name": "com.example.model.OrderItem",
     "fields": [{"name": "productId", "type": "java.lang.Long"}, {"name": "quantity", "type": "int"},
                {"name": "price", "type": "java.math.BigDecimal"}]},
    {"name": "com.example.model.Order", "parent": "com.example.model.BaseEntity",
     "fields": [
       {"name": "userId", "type": "java.lang.Long"},
       {"name": "orderItems", "type": "java.util.List<com.example.model.OrderItem>"},
       {"name": "tags", "type": "java.util.Set<java.lang.String>"},
       {"name": "attributes", "type": "java.util.Map<java.lang.String, java.lang.String>"}
     ]},
    {"name": "com.example.model.Category",
     "fields": [
       {"name": "name", "type": "java.lang.String"},
       {"name": "parent", "type": "com.example.model.Category"},
       {"name": "children", "type": "java.util.List<com.example.model.Category>"}
     ]}
  ],
  "interfaces": [
    {"name": "com.example.service.UserService",
     "methods": [
       {"name": "findUsers", "parameters": [{"name": "keyword", "type": "java.lang.String"}, {"type": "int"}],
        "return_type": "java.util.List<com.example.model.User>"},
       {"name": "updateUser", "parameters": [{"name": "user", "type": "com.example.model.User"}]}
     ]}
  ],
  "definitions": [
    {"canonicalName": "com.example.service.OrderService",
     "methods": [
       {"name": "createOrder", "parameterTypes": ["com.example.model.Order"], "parameterNames": ["order"],
        "returnType": "java.lang.Long"},
       {"name": "cancelOrder", "parameterTypes": ["java.lang.Long", "java.lang.String"],
        "parameterNames": ["orderId", "reason"]}
     ]},
    {"canonicalName": "com.example.service.CategoryService",
     "methods": [
       {"name": "saveCategory", "parameterTypes": ["com.example.model.Category"], "parameterNames": ["category"]}
     ]}
  ],
  "entities": {"user": "com.example.model.User", "order": "com.example.model.Order"}
}"#;

/// Parsed sample catalog.
pub fn sample_catalog() -> MetadataCatalog {
    MetadataCatalog::from_json(SAMPLE_CATALOG).expect("sample catalog parses")
}

/// Store, type registry, and entity hints loaded from the sample catalog.
pub struct SampleMetadata {
    /// Curated rows.
    pub store: Arc<MemMetadataStore>,
    /// Type and interface structures.
    pub types: Arc<TypeRegistry>,
    /// Entity hints.
    pub entities: EntityTypes,
}

/// Loads the sample catalog into fresh in-memory stores.
pub fn sample_metadata() -> SampleMetadata {
    let catalog = sample_catalog();
    let store = Arc::new(MemMetadataStore::new());
    let types = Arc::new(TypeRegistry::new());
    catalog.load_into(&store, &types);
    SampleMetadata {
        store,
        types,
        entities: catalog.entity_types(),
    }
}

/// Key of a sample service at version `1.0.0`.
pub fn service_key(interface: &str) -> ServiceKey {
    ServiceKey::new(interface).with_version("1.0.0")
}

/// Provider-added event for a sample service.
pub fn provider_added(interface: &str, address: &str, methods: &[&str]) -> ProviderEvent {
    ProviderEvent::Added(
        ProviderInfo::new(service_key(interface), address).with_methods(methods.iter().copied()),
    )
}

/// Provider-removed event for a sample service.
pub fn provider_removed(interface: &str, address: &str) -> ProviderEvent {
    ProviderEvent::Removed(ProviderInfo::new(service_key(interface), address))
}

/// Temporary home directory with a catalog file written under `~/.zkmcp`.
pub struct TestFixture {
    /// Backing temp dir, removed on drop.
    pub tempdir: tempfile::TempDir,
    /// Path of the written sample catalog.
    pub catalog_path: PathBuf,
}

impl TestFixture {
    /// Creates `$HOME/.zkmcp/catalog.json` holding the sample catalog.
    ///
    /// Does NOT set HOME; use `home_guard()` for that.
    pub fn new() -> std::io::Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let dir = tempdir.path().join(".zkmcp");
        std::fs::create_dir_all(&dir)?;
        let catalog_path = dir.join("catalog.json");
        std::fs::write(&catalog_path, SAMPLE_CATALOG)?;
        Ok(Self {
            tempdir,
            catalog_path,
        })
    }

    /// Path to use as HOME.
    pub fn home_path(&self) -> &std::path::Path {
        self.tempdir.path()
    }

    /// Sets HOME to the fixture directory until the guard drops.
    pub fn home_guard(&self) -> EnvVarGuard {
        set_env_var("HOME", Some(self.home_path().to_str().unwrap_or_default()))
    }

    /// Writes a file relative to the fixture home.
    pub fn write(&self, relative: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.tempdir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
