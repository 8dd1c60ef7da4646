use parking_lot::RwLock;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::types::{ApprovalStatus, ProviderEvent, ServiceDescriptor, ServiceKey};

/// Effect of applying one provider event to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Online count went from zero to one.
    WentOnline,
    /// Online count dropped to zero.
    WentOffline,
    /// Providers or advertised methods changed while staying online.
    ProvidersChanged,
    /// Duplicate add, unknown remove, or otherwise nothing changed.
    Unchanged,
}

/// Live view of discovered services, fed by provider events.
///
/// Duplicate adds and removes for unknown providers are tolerated, so events
/// may arrive reordered without counts drifting.
#[derive(Debug, Default)]
pub struct ServiceCatalog {
    services: RwLock<HashMap<ServiceKey, ServiceDescriptor>>,
}

impl ServiceCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event and reports what changed.
    pub fn apply(&self, event: &ProviderEvent) -> Transition {
        match event {
            ProviderEvent::Added(provider) => {
                let mut services = self.services.write();
                let descriptor = services
                    .entry(provider.key.clone())
                    .or_insert_with(|| ServiceDescriptor::new(provider.key.clone()));
                let was_online = descriptor.is_online();
                let inserted = descriptor.providers.insert(provider.address.clone());
                let methods_before = descriptor.methods.len();
                descriptor.methods.extend(provider.methods.iter().cloned());
                descriptor.protocol = provider.protocol.clone();
                if provider.application.is_some() {
                    descriptor.application = provider.application.clone();
                }
                descriptor.updated_at = OffsetDateTime::now_utc();

                if !was_online && inserted {
                    Transition::WentOnline
                } else if inserted || descriptor.methods.len() != methods_before {
                    Transition::ProvidersChanged
                } else {
                    debug!(
                        target: "zkmcp::discovery",
                        service = %provider.key,
                        address = %provider.address,
                        "duplicate provider add ignored"
                    );
                    Transition::Unchanged
                }
            }
            ProviderEvent::Removed(provider) => {
                let mut services = self.services.write();
                let Some(descriptor) = services.get_mut(&provider.key) else {
                    debug!(
                        target: "zkmcp::discovery",
                        service = %provider.key,
                        address = %provider.address,
                        "remove for unknown service ignored"
                    );
                    return Transition::Unchanged;
                };
                if !descriptor.providers.remove(&provider.address) {
                    debug!(
                        target: "zkmcp::discovery",
                        service = %provider.key,
                        address = %provider.address,
                        "remove for unknown provider ignored"
                    );
                    return Transition::Unchanged;
                }
                descriptor.updated_at = OffsetDateTime::now_utc();
                if descriptor.is_online() {
                    Transition::ProvidersChanged
                } else {
                    Transition::WentOffline
                }
            }
        }
    }

    /// Mirrors an approval status onto the descriptor, creating an offline
    /// descriptor when the service has not been discovered yet.
    pub fn set_approval(&self, key: &ServiceKey, status: ApprovalStatus) {
        let mut services = self.services.write();
        let descriptor = services
            .entry(key.clone())
            .or_insert_with(|| ServiceDescriptor::new(key.clone()));
        descriptor.approval = status;
        descriptor.updated_at = OffsetDateTime::now_utc();
    }

    /// Snapshot of one service.
    pub fn get(&self, key: &ServiceKey) -> Option<ServiceDescriptor> {
        self.services.read().get(key).cloned()
    }

    /// Number of online providers; zero for unknown services.
    pub fn online_count(&self, key: &ServiceKey) -> usize {
        self.services
            .read()
            .get(key)
            .map(ServiceDescriptor::online_count)
            .unwrap_or(0)
    }

    /// All services sorted by key.
    pub fn list(&self) -> Vec<ServiceDescriptor> {
        let mut all: Vec<_> = self.services.read().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Services implementing the given interface, any version or group.
    pub fn by_interface(&self, interface: &str) -> Vec<ServiceDescriptor> {
        let mut found: Vec<_> = self
            .services
            .read()
            .values()
            .filter(|d| d.key.interface == interface)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found
    }
}
