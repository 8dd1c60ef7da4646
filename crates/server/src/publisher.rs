//! Idempotent publication of tool definitions to a tool registry.
//!
//! The publisher remembers a SHA-256 fingerprint of every tool it sent, so
//! republishing an unchanged definition never reaches the registry. Status
//! updates are likewise sent only when the online flag actually flips.

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use zkmcp_discovery::ServiceKey;
use zkmcp_schema::ToolDefinition;

/// Errors reported by a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PublishError {
    /// The registry could not be reached.
    #[error("tool registry unavailable: {0}")]
    Unavailable(String),
    /// The registry refused the tool.
    #[error("tool {tool} rejected by registry: {reason}")]
    Rejected {
        /// Tool name.
        tool: String,
        /// Registry-provided reason.
        reason: String,
    },
}

/// External tool registry the bridge publishes into.
#[cfg_attr(test, automock)]
pub trait ToolRegistry: Send + Sync {
    /// Adds or replaces one tool of a service.
    fn publish(&self, service: &ServiceKey, tool: &ToolDefinition) -> Result<(), PublishError>;

    /// Removes every tool of a service.
    fn withdraw(&self, service: &ServiceKey) -> Result<(), PublishError>;

    /// Marks a service's tools callable or not.
    fn update_status(&self, service: &ServiceKey, online: bool) -> Result<(), PublishError>;
}

/// Result of a publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Sent to the registry.
    Published,
    /// Same content was already published; nothing sent.
    Unchanged,
}

/// SHA-256 of a tool's JSON form, hex encoded.
///
/// Object keys serialize sorted, so equal definitions hash equally.
pub fn fingerprint(tool: &ToolDefinition) -> String {
    let mut hasher = Sha256::new();
    match serde_json::to_vec(tool) {
        Ok(bytes) => hasher.update(&bytes),
        // Not reachable for plain JSON values; hash the debug form instead.
        Err(_) => hasher.update(format!("{tool:?}").as_bytes()),
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
struct PublishedState {
    // service -> tool name -> fingerprint
    tools: HashMap<ServiceKey, BTreeMap<String, String>>,
    status: HashMap<ServiceKey, bool>,
}

/// Publishes tools through a [`ToolRegistry`] without repeating work.
pub struct ToolPublisher {
    registry: Arc<dyn ToolRegistry>,
    state: RwLock<PublishedState>,
}

impl ToolPublisher {
    /// Wraps a registry.
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            registry,
            state: RwLock::new(PublishedState::default()),
        }
    }

    /// Publishes a tool unless identical content is already published.
    ///
    /// A failed publish leaves no fingerprint, so the next attempt retries.
    pub fn publish(
        &self,
        service: &ServiceKey,
        tool: &ToolDefinition,
    ) -> Result<PublishOutcome, PublishError> {
        let digest = fingerprint(tool);
        {
            let state = self.state.read();
            let known = state
                .tools
                .get(service)
                .and_then(|tools| tools.get(&tool.name));
            if known == Some(&digest) {
                debug!(target: "zkmcp::publish", service = %service, tool = %tool.name, "tool unchanged");
                return Ok(PublishOutcome::Unchanged);
            }
        }

        self.registry.publish(service, tool)?;
        info!(target: "zkmcp::publish", service = %service, tool = %tool.name, "tool published");
        self.state
            .write()
            .tools
            .entry(service.clone())
            .or_default()
            .insert(tool.name.clone(), digest);
        Ok(PublishOutcome::Published)
    }

    /// Withdraws every tool of a service. Returns how many were removed;
    /// a service with nothing published is a no-op.
    pub fn withdraw(&self, service: &ServiceKey) -> Result<usize, PublishError> {
        let count = match self.state.read().tools.get(service) {
            Some(tools) if !tools.is_empty() => tools.len(),
            _ => return Ok(0),
        };
        self.registry.withdraw(service)?;
        let mut state = self.state.write();
        state.tools.remove(service);
        state.status.remove(service);
        info!(target: "zkmcp::publish", service = %service, tools = count, "tools withdrawn");
        Ok(count)
    }

    /// Reports a service online or offline when the flag changes.
    /// Returns whether the registry was called.
    pub fn update_status(&self, service: &ServiceKey, online: bool) -> Result<bool, PublishError> {
        if self.state.read().status.get(service) == Some(&online) {
            return Ok(false);
        }
        if let Err(e) = self.registry.update_status(service, online) {
            warn!(
                target: "zkmcp::publish",
                service = %service,
                online,
                error = %e,
                "status update failed"
            );
            return Err(e);
        }
        self.state.write().status.insert(service.clone(), online);
        debug!(target: "zkmcp::publish", service = %service, online, "status updated");
        Ok(true)
    }

    /// Whether any tool of the service is published.
    pub fn is_published(&self, service: &ServiceKey) -> bool {
        self.state
            .read()
            .tools
            .get(service)
            .is_some_and(|tools| !tools.is_empty())
    }

    /// Published tool names of a service, sorted.
    pub fn published_tools(&self, service: &ServiceKey) -> Vec<String> {
        self.state
            .read()
            .tools
            .get(service)
            .map(|tools| tools.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Services with at least one published tool, sorted.
    pub fn published_services(&self) -> Vec<ServiceKey> {
        let mut services: Vec<_> = self
            .state
            .read()
            .tools
            .iter()
            .filter(|(_, tools)| !tools.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        services.sort();
        services
    }

    /// Services that published a tool with this name, sorted.
    pub fn services_for_tool(&self, tool: &str) -> Vec<ServiceKey> {
        let mut services: Vec<_> = self
            .state
            .read()
            .tools
            .iter()
            .filter(|(_, tools)| tools.contains_key(tool))
            .map(|(key, _)| key.clone())
            .collect();
        services.sort();
        services
    }

    /// Drops one tool's fingerprint so the next publish resends it.
    pub fn forget(&self, service: &ServiceKey, tool: &str) {
        if let Some(tools) = self.state.write().tools.get_mut(service) {
            tools.remove(tool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde_json::json;

    fn key() -> ServiceKey {
        ServiceKey::new("com.example.UserService").with_version("1.0.0")
    }

    fn tool(description: &str) -> ToolDefinition {
        ToolDefinition {
            name: "com.example.UserService.getUserById".into(),
            description: description.into(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint(&tool("a")), fingerprint(&tool("a")));
        assert_ne!(fingerprint(&tool("a")), fingerprint(&tool("b")));
        assert_eq!(fingerprint(&tool("a")).len(), 64);
    }

    #[test]
    fn unchanged_tool_is_not_resent() {
        let mut registry = MockToolRegistry::new();
        registry.expect_publish().times(2).returning(|_, _| Ok(()));
        let publisher = ToolPublisher::new(Arc::new(registry));

        assert_eq!(publisher.publish(&key(), &tool("a")).unwrap(), PublishOutcome::Published);
        assert_eq!(publisher.publish(&key(), &tool("a")).unwrap(), PublishOutcome::Unchanged);
        assert_eq!(publisher.publish(&key(), &tool("b")).unwrap(), PublishOutcome::Published);
        assert_eq!(publisher.published_tools(&key()), vec![tool("b").name]);
    }

    #[test]
    fn failed_publish_is_retried() {
        let mut registry = MockToolRegistry::new();
        let mut seq = mockall::Sequence::new();
        registry
            .expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(PublishError::Unavailable("down".into())));
        registry
            .expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let publisher = ToolPublisher::new(Arc::new(registry));

        assert!(publisher.publish(&key(), &tool("a")).is_err());
        assert!(!publisher.is_published(&key()));
        assert_eq!(publisher.publish(&key(), &tool("a")).unwrap(), PublishOutcome::Published);
    }

    #[test]
    fn withdraw_of_unpublished_service_is_a_no_op() {
        let mut registry = MockToolRegistry::new();
        registry.expect_withdraw().never();
        let publisher = ToolPublisher::new(Arc::new(registry));
        assert_eq!(publisher.withdraw(&key()).unwrap(), 0);
    }

    #[test]
    fn withdraw_clears_fingerprints() {
        let mut registry = MockToolRegistry::new();
        registry.expect_publish().times(2).returning(|_, _| Ok(()));
        registry
            .expect_withdraw()
            .with(eq(key()))
            .times(1)
            .returning(|_| Ok(()));
        let publisher = ToolPublisher::new(Arc::new(registry));
        publisher.publish(&key(), &tool("a")).unwrap();
        assert_eq!(publisher.withdraw(&key()).unwrap(), 1);
        assert!(publisher.published_services().is_empty());
        // republish after withdraw reaches the registry again
        assert_eq!(publisher.publish(&key(), &tool("a")).unwrap(), PublishOutcome::Published);
    }

    #[test]
    fn status_updates_only_on_change() {
        let mut registry = MockToolRegistry::new();
        registry
            .expect_update_status()
            .times(2)
            .returning(|_, _| Ok(()));
        let publisher = ToolPublisher::new(Arc::new(registry));
        assert!(publisher.update_status(&key(), true).unwrap());
        assert!(!publisher.update_status(&key(), true).unwrap());
        assert!(publisher.update_status(&key(), false).unwrap());
    }

    #[test]
    fn lookup_services_by_tool_name() {
        let mut registry = MockToolRegistry::new();
        registry.expect_publish().returning(|_, _| Ok(()));
        let publisher = ToolPublisher::new(Arc::new(registry));
        let v2 = ServiceKey::new("com.example.UserService").with_version("2.0.0");
        publisher.publish(&v2, &tool("a")).unwrap();
        publisher.publish(&key(), &tool("a")).unwrap();
        assert_eq!(
            publisher.services_for_tool("com.example.UserService.getUserById"),
            vec![key(), v2]
        );
        publisher.forget(&key(), "com.example.UserService.getUserById");
        assert_eq!(publisher.published_services(), vec![
            ServiceKey::new("com.example.UserService").with_version("2.0.0")
        ]);
    }
}
