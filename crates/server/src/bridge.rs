//! The bridge: discovery events and approval decisions in, published tools out.
//!
//! ```text
//! provider event -> catalog -> approved? -> resolver -> synthesizer -> publisher
//! tool call      -> publisher lookup -> resolver (cached) -> converter -> call arguments
//! ```
//!
//! Catalog updates and the publish or withdraw calls that follow them run
//! under a per-service lock, so tools are only left published while the
//! service is approved and online.
//!
//! Approval transitions, audit entries and publish calls are separate steps.
//! A failed publish is reported but never rolls back an approval;
//! [`Bridge::reconcile`] repairs the difference later.

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use zkmcp_discovery::{ApprovalStatus, ProviderEvent, ServiceCatalog, ServiceKey, Transition};
use zkmcp_metadata::{
    EntityTypes, HeuristicOptions, HeuristicTier, MetadataStore, ResolvedSignature,
    SignatureResolver, SignatureSource, TypeDescriptorProvider,
};
use zkmcp_schema::{
    legacy_tool, split_tool_name, ArgValue, ConversionIssue, ParameterConverter, SchemaOptions,
    SchemaSynthesizer, ToolDefinition, LEGACY_ARGS_KEY,
};
use zkmcp_state::{
    ApprovalError, ApprovalGate, ApprovalRecord, ApprovalRequest, ApprovalSnapshot,
};

use crate::publisher::{PublishOutcome, ToolPublisher, ToolRegistry};

/// Errors surfaced to bridge callers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// Approval state machine refused the action.
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    /// No published service offers this tool.
    #[error("unknown tool {0}")]
    UnknownTool(String),
    /// The tool exists but its service is not approved.
    #[error("tool {tool} is not approved for service {service}")]
    NotApproved {
        /// Tool name.
        tool: String,
        /// Owning service.
        service: ServiceKey,
    },
    /// The tool exists but its service has no online provider.
    #[error("tool {tool} has no online provider for service {service}")]
    Offline {
        /// Tool name.
        tool: String,
        /// Owning service.
        service: ServiceKey,
    },
}

/// Where method metadata comes from.
#[derive(Default)]
pub struct MetadataSources {
    /// Curated rows; enables the persisted tier and description overlay.
    pub store: Option<Arc<dyn MetadataStore>>,
    /// Structural type information; enables introspection and object expansion.
    pub types: Option<Arc<dyn TypeDescriptorProvider>>,
    /// Entity hints for name heuristics.
    pub entities: EntityTypes,
}

/// Tunables for resolution and schema synthesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeOptions {
    /// Schema synthesis options.
    pub schema: SchemaOptions,
    /// Heuristic tier options.
    pub heuristics: HeuristicOptions,
}

// ============================================================================
// Reports
// ============================================================================

/// What one service publication did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Tools sent to the registry.
    pub published: usize,
    /// Tools skipped because identical content was already published.
    pub unchanged: usize,
    /// `tool: error` for every failed publish.
    pub failures: Vec<String>,
}

impl PublishReport {
    fn absorb(&mut self, other: PublishReport) {
        self.published += other.published;
        self.unchanged += other.unchanged;
        self.failures.extend(other.failures);
    }
}

/// Result of an approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalOutcome {
    /// Record after the transition.
    pub record: ApprovalRecord,
    /// Publication triggered by the decision, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishReport>,
    /// Tools withdrawn by the decision.
    pub withdrawn: usize,
}

impl ApprovalOutcome {
    fn recorded(record: ApprovalRecord) -> Self {
        Self {
            record,
            publish: None,
            withdrawn: 0,
        }
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Services checked.
    pub services: usize,
    /// Aggregate publication counts.
    pub publish: PublishReport,
    /// Tools withdrawn from ineligible services.
    pub withdrawn: usize,
}

/// Arguments ready for an RPC invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedCall {
    /// Service that will receive the call.
    pub service: ServiceKey,
    /// Interface name.
    pub interface: String,
    /// Method name.
    pub method: String,
    /// Tier that produced the signature; `None` for legacy positional calls.
    pub source: Option<SignatureSource>,
    /// Parameter types in call order; empty for legacy positional calls.
    pub types: Vec<String>,
    /// Argument values in call order.
    pub values: Vec<ArgValue>,
    /// Values forwarded unconverted.
    pub issues: Vec<ConversionIssue>,
}

impl PreparedCall {
    /// Plain JSON argument values in call order.
    pub fn json_values(&self) -> Vec<Value> {
        self.values.iter().map(ArgValue::to_json).collect()
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Connects discovery, approval, resolution and publication.
///
/// All state sits behind interior locks, so a shared `&Bridge` can handle
/// events from several threads.
pub struct Bridge {
    catalog: ServiceCatalog,
    gate: ApprovalGate,
    resolver: SignatureResolver,
    synth: SchemaSynthesizer,
    converter: ParameterConverter,
    store: Option<Arc<dyn MetadataStore>>,
    types: Option<Arc<dyn TypeDescriptorProvider>>,
    publisher: ToolPublisher,
    // Striped by service key; held while a service's catalog entry and its
    // published tools are brought in line. Never nested.
    service_locks: Vec<Mutex<()>>,
}

const SERVICE_LOCK_STRIPES: usize = 64;

impl Bridge {
    /// Builds a bridge publishing into `registry`.
    pub fn new(
        registry: Arc<dyn ToolRegistry>,
        sources: MetadataSources,
        options: BridgeOptions,
    ) -> Self {
        let mut heuristics = HeuristicTier::new(sources.entities).with_options(options.heuristics);
        let mut builder = SignatureResolver::builder();
        if let Some(types) = &sources.types {
            builder = builder.introspection(Arc::clone(types));
            heuristics = heuristics.with_types(Arc::clone(types));
        }
        if let Some(store) = &sources.store {
            builder = builder.persisted(Arc::clone(store));
        }
        let resolver = builder.heuristics(heuristics).build();

        Self {
            catalog: ServiceCatalog::new(),
            gate: ApprovalGate::new(),
            resolver,
            synth: SchemaSynthesizer::new(sources.types.clone()).with_options(options.schema),
            converter: ParameterConverter::new(sources.types.clone()),
            store: sources.store,
            types: sources.types,
            publisher: ToolPublisher::new(registry),
            service_locks: (0..SERVICE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock_service(&self, key: &ServiceKey) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let stripe = (hasher.finish() % SERVICE_LOCK_STRIPES as u64) as usize;
        self.service_locks[stripe].lock()
    }

    /// Replaces the approval gate, e.g. with one loaded from disk.
    pub fn with_gate(mut self, gate: ApprovalGate) -> Self {
        // Records come back ordered by id, so the latest per service wins.
        for record in gate.list() {
            self.catalog.set_approval(&record.subject, record.status);
        }
        self.gate = gate;
        self
    }

    /// Replaces approval state in place and reconciles published tools.
    ///
    /// Used when another process (the `approvals` CLI) has rewritten the
    /// approval file.
    pub fn reload_approvals(&self, snapshot: ApprovalSnapshot) -> ReconcileReport {
        self.gate.restore(snapshot);
        for descriptor in self.catalog.list() {
            if self.gate.status_of(&descriptor.key).is_none() {
                self.catalog
                    .set_approval(&descriptor.key, ApprovalStatus::default());
            }
        }
        for record in self.gate.list() {
            self.catalog.set_approval(&record.subject, record.status);
        }
        self.reconcile()
    }

    /// Discovered services.
    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Approval state.
    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    /// Signature resolver.
    pub fn resolver(&self) -> &SignatureResolver {
        &self.resolver
    }

    /// Publication state.
    pub fn publisher(&self) -> &ToolPublisher {
        &self.publisher
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Applies a provider event and publishes, refreshes, or withdraws the
    /// service's tools when it is approved.
    pub fn handle_event(&self, event: &ProviderEvent) -> Transition {
        let key = event.key();
        let _guard = self.lock_service(key);
        let transition = self.catalog.apply(event);
        debug!(
            target: "zkmcp::bridge",
            service = %key,
            transition = ?transition,
            "provider event applied"
        );
        if !self.gate.is_approved(key) {
            return transition;
        }
        match transition {
            Transition::WentOnline => {
                self.publish_service(key);
                self.mark_status(key, true);
            }
            Transition::ProvidersChanged => {
                self.publish_service(key);
            }
            Transition::WentOffline => {
                self.mark_status(key, false);
                self.retract(key);
            }
            Transition::Unchanged => {}
        }
        transition
    }

    // ------------------------------------------------------------------
    // Approval
    // ------------------------------------------------------------------

    /// Opens (or resubmits) an approval request.
    pub fn create_approval(&self, request: ApprovalRequest) -> Result<ApprovalOutcome, BridgeError> {
        let record = self.gate.create(request)?;
        let _guard = self.lock_service(&record.subject);
        self.catalog.set_approval(&record.subject, record.status);
        let withdrawn = self.retract(&record.subject);
        Ok(ApprovalOutcome {
            withdrawn,
            ..ApprovalOutcome::recorded(record)
        })
    }

    /// Approves a pending request and publishes every method of the service
    /// when it has an online provider.
    pub fn approve(
        &self,
        id: u64,
        approver: &str,
        comment: Option<&str>,
    ) -> Result<ApprovalOutcome, BridgeError> {
        let record = self.gate.approve(id, approver, comment)?;
        let _guard = self.lock_service(&record.subject);
        self.catalog.set_approval(&record.subject, record.status);
        if self.catalog.online_count(&record.subject) == 0 {
            info!(
                target: "zkmcp::bridge",
                service = %record.subject,
                "approved service has no online provider; publishing deferred"
            );
            return Ok(ApprovalOutcome::recorded(record));
        }
        let report = self.publish_service(&record.subject);
        self.mark_status(&record.subject, true);
        Ok(ApprovalOutcome {
            publish: Some(report),
            ..ApprovalOutcome::recorded(record)
        })
    }

    /// Rejects a pending request.
    pub fn reject(
        &self,
        id: u64,
        approver: &str,
        comment: Option<&str>,
    ) -> Result<ApprovalOutcome, BridgeError> {
        let record = self.gate.reject(id, approver, comment)?;
        let _guard = self.lock_service(&record.subject);
        self.catalog.set_approval(&record.subject, record.status);
        let withdrawn = self.retract(&record.subject);
        Ok(ApprovalOutcome {
            withdrawn,
            ..ApprovalOutcome::recorded(record)
        })
    }

    /// Cancels a pending request.
    pub fn cancel(
        &self,
        id: u64,
        operator: &str,
        comment: Option<&str>,
    ) -> Result<ApprovalOutcome, BridgeError> {
        let record = self.gate.cancel(id, operator, comment)?;
        let _guard = self.lock_service(&record.subject);
        self.catalog.set_approval(&record.subject, record.status);
        Ok(ApprovalOutcome::recorded(record))
    }

    /// Moves a decided request back to pending and withdraws its tools.
    pub fn resubmit(
        &self,
        id: u64,
        operator: &str,
        reason: Option<&str>,
    ) -> Result<ApprovalOutcome, BridgeError> {
        let record = self.gate.resubmit(id, operator, reason)?;
        let _guard = self.lock_service(&record.subject);
        self.catalog.set_approval(&record.subject, record.status);
        let withdrawn = self.retract(&record.subject);
        Ok(ApprovalOutcome {
            withdrawn,
            ..ApprovalOutcome::recorded(record)
        })
    }

    // ------------------------------------------------------------------
    // Publication
    // ------------------------------------------------------------------

    /// Method names of a service: advertised by providers, listed in the
    /// metadata store, or declared by the introspected interface.
    pub fn methods_for(&self, key: &ServiceKey) -> BTreeSet<String> {
        let mut methods: BTreeSet<String> = self
            .catalog
            .get(key)
            .map(|d| d.methods)
            .unwrap_or_default();

        if let Some(store) = &self.store {
            let rows = store
                .find_service(&key.interface)
                .and_then(|svc| match svc {
                    Some(svc) => store.list_methods(svc.id),
                    None => Ok(Vec::new()),
                });
            match rows {
                Ok(rows) => methods.extend(rows.into_iter().map(|r| r.method.name)),
                Err(e) => debug!(
                    target: "zkmcp::bridge",
                    service = %key,
                    error = %e,
                    "metadata store unavailable; using advertised methods"
                ),
            }
        }
        if let Some(types) = &self.types {
            if let Some(iface) = types.load_interface(&key.interface) {
                methods.extend(iface.methods.iter().map(|m| m.name.clone()));
            }
        }
        methods
    }

    /// Resolved signature for a method, if any tier knows it.
    pub fn signature(&self, interface: &str, method: &str) -> Option<Arc<ResolvedSignature>> {
        self.resolver.resolve(interface, method)
    }

    /// Tool definition for a method, falling back to the positional `args`
    /// schema when no signature resolves.
    pub fn tool_for(&self, interface: &str, method: &str) -> ToolDefinition {
        match self.resolver.resolve(interface, method) {
            Some(sig) => self.synth.build_tool(&sig),
            None => {
                warn!(
                    target: "zkmcp::bridge",
                    interface,
                    method,
                    "signature unresolved; publishing positional args schema"
                );
                legacy_tool(interface, method)
            }
        }
    }

    /// Publishes every method of a service. Unchanged tools are skipped.
    pub fn publish_service(&self, key: &ServiceKey) -> PublishReport {
        let mut report = PublishReport::default();
        for method in self.methods_for(key) {
            let tool = self.tool_for(&key.interface, &method);
            match self.publisher.publish(key, &tool) {
                Ok(PublishOutcome::Published) => report.published += 1,
                Ok(PublishOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    warn!(
                        target: "zkmcp::bridge",
                        service = %key,
                        tool = %tool.name,
                        error = %e,
                        "publish failed; will retry on reconcile"
                    );
                    report.failures.push(format!("{}: {e}", tool.name));
                }
            }
        }
        report
    }

    fn mark_status(&self, key: &ServiceKey, online: bool) {
        // Failures are logged by the publisher and repaired on reconcile.
        let _ = self.publisher.update_status(key, online);
    }

    fn retract(&self, key: &ServiceKey) -> usize {
        match self.publisher.withdraw(key) {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    target: "zkmcp::bridge",
                    service = %key,
                    error = %e,
                    "withdraw failed; will retry on reconcile"
                );
                0
            }
        }
    }

    /// Brings published tools in line with approval and provider state.
    ///
    /// Approved services with an online provider are (re)published and marked
    /// online; anything else that still has tools published is withdrawn.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let services = self.catalog.list();
        report.services = services.len();

        for descriptor in &services {
            let key = &descriptor.key;
            let _guard = self.lock_service(key);
            let online = self.catalog.online_count(key) > 0;
            if self.gate.is_approved(key) && online {
                report.publish.absorb(self.publish_service(key));
                if let Err(e) = self.publisher.update_status(key, true) {
                    report.publish.failures.push(format!("{key}: {e}"));
                }
            } else if self.publisher.is_published(key) {
                match self.publisher.withdraw(key) {
                    Ok(count) => report.withdrawn += count,
                    Err(e) => report.publish.failures.push(format!("{key}: {e}")),
                }
            }
        }

        info!(
            target: "zkmcp::bridge",
            services = report.services,
            published = report.publish.published,
            withdrawn = report.withdrawn,
            failures = report.publish.failures.len(),
            "reconcile finished"
        );
        report
    }

    /// Drops cached signatures for an interface (or one method) and
    /// republishes affected services. Returns how many entries were dropped.
    pub fn invalidate(&self, interface: &str, method: Option<&str>) -> usize {
        let dropped = match method {
            Some(m) => usize::from(self.resolver.invalidate(interface, m)),
            None => self.resolver.invalidate_interface(interface),
        };
        for descriptor in self.catalog.by_interface(interface) {
            let _guard = self.lock_service(&descriptor.key);
            let key = &descriptor.key;
            if self.gate.is_approved(key) && self.catalog.online_count(key) > 0 {
                self.publish_service(key);
            }
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Turns a tool call into typed invocation arguments.
    ///
    /// Unknown tools and tools of unapproved or offline services are refused.
    /// Conversion itself never fails; see [`PreparedCall::issues`].
    pub fn prepare_call(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<PreparedCall, BridgeError> {
        let (interface, method) =
            split_tool_name(tool_name).ok_or_else(|| BridgeError::UnknownTool(tool_name.into()))?;
        let candidates = self.publisher.services_for_tool(tool_name);
        let Some(first) = candidates.first() else {
            return Err(BridgeError::UnknownTool(tool_name.into()));
        };
        let approved: Vec<_> = candidates
            .iter()
            .filter(|k| self.gate.is_approved(k))
            .collect();
        if approved.is_empty() {
            return Err(BridgeError::NotApproved {
                tool: tool_name.into(),
                service: first.clone(),
            });
        }
        let Some(service) = approved
            .iter()
            .find(|k| self.catalog.online_count(k) > 0)
            .map(|k| (*k).clone())
        else {
            return Err(BridgeError::Offline {
                tool: tool_name.into(),
                service: approved[0].clone(),
            });
        };

        let prepared = self.build_call(service, interface, method, arguments);
        debug!(
            target: "zkmcp::bridge",
            tool = %tool_name,
            service = %prepared.service,
            args = prepared.values.len(),
            issues = prepared.issues.len(),
            "call prepared"
        );
        Ok(prepared)
    }

    /// Converts arguments for a method without checking publication or
    /// approval. Used for offline inspection.
    pub fn preview_call(
        &self,
        interface: &str,
        method: &str,
        arguments: &Map<String, Value>,
    ) -> PreparedCall {
        self.build_call(ServiceKey::new(interface), interface, method, arguments)
    }

    fn build_call(
        &self,
        service: ServiceKey,
        interface: &str,
        method: &str,
        arguments: &Map<String, Value>,
    ) -> PreparedCall {
        match self.resolver.resolve(interface, method) {
            Some(sig) => {
                let converted = self.converter.convert(arguments, &sig);
                PreparedCall {
                    service,
                    interface: interface.into(),
                    method: method.into(),
                    source: Some(sig.source),
                    types: converted.types,
                    values: converted.values,
                    issues: converted.issues,
                }
            }
            None => {
                let values = arguments
                    .get(LEGACY_ARGS_KEY)
                    .and_then(Value::as_array)
                    .map(|args| args.iter().cloned().map(ArgValue::Json).collect())
                    .unwrap_or_default();
                PreparedCall {
                    service,
                    interface: interface.into(),
                    method: method.into(),
                    source: None,
                    types: Vec::new(),
                    values,
                    issues: Vec::new(),
                }
            }
        }
    }

    /// Current status of a service's latest approval request.
    pub fn approval_status(&self, key: &ServiceKey) -> Option<ApprovalStatus> {
        self.gate.status_of(key)
    }
}
