//! In-process tool registry holding MCP tool models grouped by service.

use parking_lot::RwLock;
use rmcp::model::Tool;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use zkmcp_discovery::ServiceKey;
use zkmcp_schema::ToolDefinition;

use crate::publisher::{PublishError, ToolRegistry};
use crate::tools::to_mcp_tool;

/// One call received by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryOp {
    /// A tool was added or replaced.
    Publish {
        /// Service key.
        service: String,
        /// Tool name.
        tool: String,
    },
    /// A service's tools were removed.
    Withdraw {
        /// Service key.
        service: String,
    },
    /// A service's callable flag changed.
    Status {
        /// Service key.
        service: String,
        /// New flag.
        online: bool,
    },
}

#[derive(Debug, Default)]
struct ServiceTools {
    online: bool,
    tools: BTreeMap<String, Tool>,
}

#[derive(Debug, Default)]
struct Inner {
    services: HashMap<ServiceKey, ServiceTools>,
    ops: Vec<RegistryOp>,
}

/// Registry of published tools kept in memory.
///
/// Tools of offline services are retained but hidden from [`list_tools`](Self::list_tools).
#[derive(Debug, Default)]
pub struct InMemoryToolRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callable tools across online services, sorted by name.
    pub fn list_tools(&self) -> Vec<Tool> {
        let inner = self.inner.read();
        let mut tools: Vec<Tool> = inner
            .services
            .values()
            .filter(|s| s.online)
            .flat_map(|s| s.tools.values().cloned())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Tools of one service regardless of status.
    pub fn service_tools(&self, service: &ServiceKey) -> Vec<Tool> {
        self.inner
            .read()
            .services
            .get(service)
            .map(|s| s.tools.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Looks up a callable tool by name.
    pub fn get(&self, name: &str) -> Option<Tool> {
        let inner = self.inner.read();
        let mut keys: Vec<_> = inner
            .services
            .iter()
            .filter(|(_, s)| s.online)
            .filter_map(|(k, s)| s.tools.get(name).map(|t| (k, t)))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        keys.first().map(|(_, t)| (*t).clone())
    }

    /// Whether a service is marked online.
    pub fn is_online(&self, service: &ServiceKey) -> bool {
        self.inner
            .read()
            .services
            .get(service)
            .is_some_and(|s| s.online)
    }

    /// Total tools held, online or not.
    pub fn len(&self) -> usize {
        self.inner.read().services.values().map(|s| s.tools.len()).sum()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call received so far, oldest first.
    pub fn ops(&self) -> Vec<RegistryOp> {
        self.inner.read().ops.clone()
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn publish(&self, service: &ServiceKey, tool: &ToolDefinition) -> Result<(), PublishError> {
        let mut inner = self.inner.write();
        inner
            .services
            .entry(service.clone())
            .or_default()
            .tools
            .insert(tool.name.clone(), to_mcp_tool(service, tool));
        inner.ops.push(RegistryOp::Publish {
            service: service.to_string(),
            tool: tool.name.clone(),
        });
        Ok(())
    }

    fn withdraw(&self, service: &ServiceKey) -> Result<(), PublishError> {
        let mut inner = self.inner.write();
        inner.services.remove(service);
        inner.ops.push(RegistryOp::Withdraw {
            service: service.to_string(),
        });
        Ok(())
    }

    fn update_status(&self, service: &ServiceKey, online: bool) -> Result<(), PublishError> {
        let mut inner = self.inner.write();
        inner.services.entry(service.clone()).or_default().online = online;
        inner.ops.push(RegistryOp::Status {
            service: service.to_string(),
            online,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmcp_schema::legacy_tool;

    #[test]
    fn test_registry_operations() {
        let registry = InMemoryToolRegistry::new();
        let v1 = ServiceKey::new("a.S").with_version("1");
        let v2 = ServiceKey::new("a.S").with_version("2");

        registry.publish(&v1, &legacy_tool("a.S", "m")).unwrap();
        registry.publish(&v1, &legacy_tool("a.S", "n")).unwrap();
        registry.publish(&v2, &legacy_tool("a.S", "m")).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.list_tools().is_empty());

        registry.update_status(&v2, true).unwrap();
        assert_eq!(registry.list_tools().len(), 1);
        assert!(registry.get("a.S.m").unwrap().title.unwrap().contains(":2:"));
        assert!(registry.get("a.S.n").is_none());

        registry.update_status(&v1, true).unwrap();
        assert!(registry.get("a.S.m").unwrap().title.unwrap().contains(":1:"));

        registry.withdraw(&v1).unwrap();
        assert_eq!(registry.service_tools(&v1).len(), 0);
        assert!(!registry.is_online(&v1));
        assert_eq!(registry.ops().len(), 6);
        assert_eq!(
            registry.ops().last(),
            Some(&RegistryOp::Withdraw {
                service: v1.to_string()
            })
        );
    }
}
