//! Startup loading of metadata catalog files.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use zkmcp_metadata::{CatalogStats, MemMetadataStore, MetadataCatalog, TypeRegistry};

use crate::bridge::MetadataSources;

/// Default catalog location: `~/.zkmcp/catalog.json`.
pub fn default_catalog_path() -> Result<PathBuf> {
    Ok(zkmcp_state::state_dir()?.join("catalog.json"))
}

/// Reads one catalog file.
pub fn read_catalog(path: &Path) -> Result<MetadataCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    MetadataCatalog::from_json(&raw)
        .with_context(|| format!("failed to parse catalog {}", path.display()))
}

/// Merges catalog files in order. With no paths, the default catalog is used
/// when it exists; otherwise the result is empty.
pub fn load_catalogs(paths: &[PathBuf]) -> Result<MetadataCatalog> {
    let mut merged = MetadataCatalog::default();
    if paths.is_empty() {
        let fallback = default_catalog_path()?;
        if fallback.exists() {
            merged.merge(read_catalog(&fallback)?);
        }
        return Ok(merged);
    }
    for path in paths {
        merged.merge(read_catalog(path)?);
    }
    Ok(merged)
}

/// Loads a catalog into fresh in-memory sources. Extra entity hints override
/// the catalog's own.
pub fn build_sources(
    catalog: &MetadataCatalog,
    extra_entities: &BTreeMap<String, String>,
) -> (MetadataSources, CatalogStats) {
    let store = Arc::new(MemMetadataStore::new());
    let types = Arc::new(TypeRegistry::new());
    let stats = catalog.load_into(&store, &types);
    let mut entities = catalog.entity_types();
    for (entity, type_name) in extra_entities {
        entities.insert(entity, type_name.clone());
    }
    info!(
        target: "zkmcp::catalog",
        services = stats.services,
        methods = stats.methods,
        types = stats.types,
        interfaces = stats.interfaces,
        entities = entities.len(),
        "metadata catalog loaded"
    );
    (
        MetadataSources {
            store: Some(store),
            types: Some(types),
            entities,
        },
        stats,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_guard;
    use zkmcp_test_utils::{TestFixture, USER_SERVICE};

    #[test]
    fn falls_back_to_home_catalog() {
        let _g = env_guard();
        let fixture = TestFixture::new().unwrap();
        let _home = fixture.home_guard();
        let catalog = load_catalogs(&[]).unwrap();
        assert_eq!(catalog.services[0].interface, USER_SERVICE);
    }

    #[test]
    fn explicit_paths_merge_in_order() {
        let fixture = TestFixture::new().unwrap();
        let extra = fixture
            .write("extra.json", r#"{"entities": {"user": "com.other.User"}}"#)
            .unwrap();
        let catalog = load_catalogs(&[fixture.catalog_path.clone(), extra]).unwrap();
        assert_eq!(catalog.entity_types().get("user"), Some("com.other.User"));
    }

    #[test]
    fn unreadable_catalog_names_the_file() {
        let err = load_catalogs(&[PathBuf::from("/nonexistent/zkmcp.json")]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/zkmcp.json"));
    }

    #[test]
    fn extra_entities_override_catalog_hints() {
        let fixture = TestFixture::new().unwrap();
        let catalog = read_catalog(&fixture.catalog_path).unwrap();
        let extra = BTreeMap::from([("user".to_string(), "com.acme.Member".to_string())]);
        let (sources, stats) = build_sources(&catalog, &extra);
        assert_eq!(sources.entities.get("User"), Some("com.acme.Member"));
        assert_eq!(stats.services, 1);
        assert!(sources.types.is_some());
    }
}
