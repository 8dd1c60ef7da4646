//! Tiered method signature resolution.
//!
//! Tiers are tried in priority order and the first hit wins:
//!
//! 1. [`IntrospectionTier`]: exact declarations from a type provider.
//! 2. [`PersistedMetadataTier`]: curated rows from a metadata store.
//! 3. [`HeuristicTier`](crate::heuristic::HeuristicTier): guesses from the method name.
//!
//! Hits are cached per `interface.method` until explicitly invalidated.
//! Misses are not cached, so metadata that arrives later is picked up on the
//! next lookup.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use zkmcp_metadata::{EntityTypes, HeuristicTier, SignatureResolver, SignatureSource};
//!
//! let resolver = SignatureResolver::builder()
//!     .heuristics(HeuristicTier::new(EntityTypes::new()))
//!     .build();
//!
//! let sig = resolver.resolve("com.example.UserService", "getUserById").unwrap();
//! assert_eq!(sig.source, SignatureSource::Heuristic);
//! assert_eq!(sig.parameters[0].name, "userId");
//!
//! let again = resolver.resolve("com.example.UserService", "getUserById").unwrap();
//! assert!(Arc::ptr_eq(&sig, &again));
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::heuristic::HeuristicTier;
use crate::introspect::TypeDescriptorProvider;
use crate::store::{MetadataStore, StoreError};
use crate::types::{signature_key, ParameterDescriptor, ResolvedSignature, SignatureSource};

/// One strategy in the resolution chain.
pub trait ResolutionTier: Send + Sync {
    /// Which source this tier reports.
    fn source(&self) -> SignatureSource;

    /// Resolves a method, or `None` to let the next tier try.
    fn try_resolve(&self, interface: &str, method: &str) -> Option<ResolvedSignature>;
}

// ============================================================================
// Introspection
// ============================================================================

/// Resolves from declared interface structure.
pub struct IntrospectionTier {
    provider: Arc<dyn TypeDescriptorProvider>,
}

impl IntrospectionTier {
    /// Creates a tier over a type provider.
    pub fn new(provider: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self { provider }
    }
}

impl ResolutionTier for IntrospectionTier {
    fn source(&self) -> SignatureSource {
        SignatureSource::Introspection
    }

    fn try_resolve(&self, interface: &str, method: &str) -> Option<ResolvedSignature> {
        let descriptor = self.provider.load_interface(interface)?;
        // Overloads resolve to the first declaration.
        let declared = descriptor.method(method)?;
        let parameters = declared
            .parameters
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let name = p
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("param{idx}"));
                ParameterDescriptor::new(name, p.type_name.clone(), idx)
            })
            .collect();
        let mut sig =
            ResolvedSignature::new(interface, method, parameters, SignatureSource::Introspection);
        sig.return_type = declared.return_type.clone();
        Some(sig)
    }
}

// ============================================================================
// Persisted metadata
// ============================================================================

/// Resolves from curated store rows.
pub struct PersistedMetadataTier {
    store: Arc<dyn MetadataStore>,
}

impl PersistedMetadataTier {
    /// Creates a tier over a metadata store.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    fn lookup(
        &self,
        interface: &str,
        method: &str,
    ) -> Result<Option<ResolvedSignature>, StoreError> {
        let Some(service) = self.store.find_service(interface)? else {
            return Ok(None);
        };
        let Some(row) = self.store.find_method(service.id, method)? else {
            return Ok(None);
        };
        let parameters = self.store.find_parameters(row.id)?;
        if parameters.is_empty() {
            return Ok(None);
        }
        let mut sig = ResolvedSignature::new(
            interface,
            method,
            parameters,
            SignatureSource::PersistedMetadata,
        );
        sig.return_type = row.method.return_type;
        sig.description = row.method.description;
        Ok(Some(sig))
    }
}

impl ResolutionTier for PersistedMetadataTier {
    fn source(&self) -> SignatureSource {
        SignatureSource::PersistedMetadata
    }

    fn try_resolve(&self, interface: &str, method: &str) -> Option<ResolvedSignature> {
        match self.lookup(interface, method) {
            Ok(found) => found,
            Err(e) => {
                debug!(
                    target: "zkmcp::resolve",
                    interface,
                    method,
                    error = %e,
                    "metadata store failed; skipping tier"
                );
                None
            }
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Overlays curated descriptions from the store onto a signature resolved by
/// another tier. Parameters match by name, then by position.
fn overlay_curated(store: &dyn MetadataStore, sig: &mut ResolvedSignature) -> Result<(), StoreError> {
    let Some(service) = store.find_service(&sig.interface)? else {
        return Ok(());
    };
    let Some(row) = store.find_method(service.id, &sig.method)? else {
        return Ok(());
    };
    if sig.description.is_none() {
        sig.description = row.method.description.clone();
    }
    if sig.return_type.is_none() {
        sig.return_type = row.method.return_type.clone();
    }
    let curated = store.find_parameters(row.id)?;
    for param in &mut sig.parameters {
        let matched = curated
            .iter()
            .find(|c| c.name == param.name)
            .or_else(|| curated.iter().find(|c| c.order == param.order));
        if let Some(c) = matched {
            if param.description.is_none() {
                param.description = c.description.clone();
            }
            if param.schema.is_none() {
                param.schema = c.schema.clone();
            }
            param.required = c.required;
        }
    }
    Ok(())
}

/// Resolves method signatures through a prioritized tier list with a cache.
///
/// Safe to share across threads; cache access is guarded by `RwLock` and
/// entries are handed out as `Arc` clones.
pub struct SignatureResolver {
    tiers: Vec<Box<dyn ResolutionTier>>,
    overlay: Option<Arc<dyn MetadataStore>>,
    cache: RwLock<HashMap<String, Arc<ResolvedSignature>>>,
}

impl SignatureResolver {
    /// Create a new builder.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Resolves a method signature, or `None` when every tier misses.
    pub fn resolve(&self, interface: &str, method: &str) -> Option<Arc<ResolvedSignature>> {
        let key = signature_key(interface, method);
        {
            let cache = self.cache.read();
            if let Some(hit) = cache.get(&key) {
                return Some(Arc::clone(hit));
            }
        }

        let mut resolved = None;
        for tier in &self.tiers {
            match tier.try_resolve(interface, method) {
                Some(sig) => {
                    debug!(
                        target: "zkmcp::resolve",
                        key = %key,
                        source = %tier.source(),
                        params = sig.parameters.len(),
                        "signature resolved"
                    );
                    resolved = Some(sig);
                    break;
                }
                None => debug!(
                    target: "zkmcp::resolve",
                    key = %key,
                    source = %tier.source(),
                    "tier skipped"
                ),
            }
        }

        let Some(mut sig) = resolved else {
            warn!(target: "zkmcp::resolve", key = %key, "no tier resolved method");
            return None;
        };
        if sig.source != SignatureSource::PersistedMetadata {
            if let Some(store) = &self.overlay {
                if let Err(e) = overlay_curated(store.as_ref(), &mut sig) {
                    debug!(
                        target: "zkmcp::resolve",
                        key = %key,
                        error = %e,
                        "curated overlay skipped"
                    );
                }
            }
        }

        // Concurrent resolvers converge on whichever entry landed first.
        let mut cache = self.cache.write();
        Some(Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(sig))))
    }

    /// Drops one cached signature. Returns whether it was cached.
    pub fn invalidate(&self, interface: &str, method: &str) -> bool {
        self.cache
            .write()
            .remove(&signature_key(interface, method))
            .is_some()
    }

    /// Drops every cached signature of an interface. Returns how many were dropped.
    pub fn invalidate_interface(&self, interface: &str) -> usize {
        let mut cache = self.cache.write();
        let before = cache.len();
        cache.retain(|_, sig| sig.interface != interface);
        before - cache.len()
    }

    /// Clear the resolution cache.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Number of cached signatures.
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }
}

/// Builder for [`SignatureResolver`]. Standard tiers keep their priority
/// regardless of call order; custom tiers run after them.
#[derive(Default)]
pub struct ResolverBuilder {
    introspection: Option<IntrospectionTier>,
    persisted: Option<PersistedMetadataTier>,
    heuristics: Option<HeuristicTier>,
    custom: Vec<Box<dyn ResolutionTier>>,
    overlay: Option<Arc<dyn MetadataStore>>,
}

impl ResolverBuilder {
    /// Enables the introspection tier.
    pub fn introspection(mut self, provider: Arc<dyn TypeDescriptorProvider>) -> Self {
        self.introspection = Some(IntrospectionTier::new(provider));
        self
    }

    /// Enables the persisted metadata tier and the curated overlay.
    pub fn persisted(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.overlay = Some(Arc::clone(&store));
        self.persisted = Some(PersistedMetadataTier::new(store));
        self
    }

    /// Enables the heuristic tier.
    pub fn heuristics(mut self, tier: HeuristicTier) -> Self {
        self.heuristics = Some(tier);
        self
    }

    /// Appends a custom tier after the standard ones.
    pub fn tier(mut self, tier: Box<dyn ResolutionTier>) -> Self {
        self.custom.push(tier);
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> SignatureResolver {
        let mut tiers: Vec<Box<dyn ResolutionTier>> = Vec::new();
        if let Some(t) = self.introspection {
            tiers.push(Box::new(t));
        }
        if let Some(t) = self.persisted {
            tiers.push(Box::new(t));
        }
        if let Some(t) = self.heuristics {
            tiers.push(Box::new(t));
        }
        tiers.extend(self.custom);
        SignatureResolver {
            tiers,
            overlay: self.overlay,
            cache: RwLock::new(HashMap::new()),
        }
    }
}
