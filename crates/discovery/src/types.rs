use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use time::OffsetDateTime;

/// Placeholder used in service keys when a version or group is absent.
pub const DEFAULT_SEGMENT: &str = "default";

/// Protocol assumed for providers that do not advertise one.
pub const DEFAULT_PROTOCOL: &str = "dubbo";

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Identity of a discovered service: interface plus optional version and group.
///
/// Displays as `interface:version:group`, with `default` for absent parts.
///
/// ```
/// use zkmcp_discovery::ServiceKey;
///
/// let key = ServiceKey::new("com.example.UserService").with_version("1.0.0");
/// assert_eq!(key.to_string(), "com.example.UserService:1.0.0:default");
/// assert_eq!(ServiceKey::parse(&key.to_string()), Some(key));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    /// Fully-qualified interface name.
    pub interface: String,
    /// Service version, if the provider declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Service group, if the provider declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ServiceKey {
    /// Creates a key with no version and no group.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            version: None,
            group: None,
        }
    }

    /// Sets the version; blank values are treated as absent.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = non_empty(version);
        self
    }

    /// Sets the group; blank values are treated as absent.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = non_empty(group);
        self
    }

    /// Version label, `default` when absent.
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_SEGMENT)
    }

    /// Group label, `default` when absent.
    pub fn group_label(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_SEGMENT)
    }

    /// Parses `interface[:version[:group]]`. `default` segments map back to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        let interface = parts.next()?.trim();
        if interface.is_empty() {
            return None;
        }
        let segment = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty() && *s != DEFAULT_SEGMENT)
                .map(str::to_string)
        };
        Some(Self {
            interface: interface.to_string(),
            version: segment(parts.next()),
            group: segment(parts.next()),
        })
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.interface,
            self.version_label(),
            self.group_label()
        )
    }
}

/// Approval state of a discovered service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting a decision. Every new service starts here.
    #[default]
    Pending,
    /// Tools may be published while providers are online.
    Approved,
    /// Tools must not be published.
    Rejected,
    /// The request was withdrawn before a decision was made.
    Cancelled,
}

impl ApprovalStatus {
    /// Returns a stable label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
            ApprovalStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One provider instance as reported by the registry watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Service the provider implements.
    #[serde(flatten)]
    pub key: ServiceKey,
    /// `host:port` of the provider. Providers are deduplicated by this value.
    pub address: String,
    /// RPC protocol, usually `dubbo`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Application name the provider registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// Method names the provider advertises.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

impl ProviderInfo {
    /// Creates provider info with the default protocol and no advertised methods.
    pub fn new(key: ServiceKey, address: impl Into<String>) -> Self {
        Self {
            key,
            address: address.into(),
            protocol: default_protocol(),
            application: None,
            methods: Vec::new(),
        }
    }

    /// Adds advertised method names.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }
}

/// A provider add or remove event from the coordination tree.
///
/// Serialized as one JSON object per line with a `kind` tag:
///
/// ```
/// use zkmcp_discovery::ProviderEvent;
///
/// let line = r#"{"kind":"added","interface":"com.example.UserService","address":"10.0.0.1:20880"}"#;
/// let event: ProviderEvent = serde_json::from_str(line).unwrap();
/// assert_eq!(event.provider().key.interface, "com.example.UserService");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// A provider node appeared.
    Added(ProviderInfo),
    /// A provider node disappeared.
    Removed(ProviderInfo),
}

impl ProviderEvent {
    /// The provider this event concerns.
    pub fn provider(&self) -> &ProviderInfo {
        match self {
            ProviderEvent::Added(p) | ProviderEvent::Removed(p) => p,
        }
    }

    /// The service this event concerns.
    pub fn key(&self) -> &ServiceKey {
        &self.provider().key
    }
}

/// Current knowledge about one discovered service.
///
/// Created on the first discovery event and never deleted; losing every
/// provider only marks it offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service identity.
    pub key: ServiceKey,
    /// RPC protocol of the most recent provider.
    pub protocol: String,
    /// Application name of the most recent provider.
    pub application: Option<String>,
    /// Mirrored approval status.
    pub approval: ApprovalStatus,
    /// Addresses of online providers.
    pub providers: BTreeSet<String>,
    /// Union of method names advertised by every provider seen so far.
    pub methods: BTreeSet<String>,
    /// Last time an event touched this descriptor.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ServiceDescriptor {
    /// Creates an offline, pending descriptor.
    pub fn new(key: ServiceKey) -> Self {
        Self {
            key,
            protocol: default_protocol(),
            application: None,
            approval: ApprovalStatus::Pending,
            providers: BTreeSet::new(),
            methods: BTreeSet::new(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Number of online providers.
    pub fn online_count(&self) -> usize {
        self.providers.len()
    }

    /// Whether at least one provider is online.
    pub fn is_online(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Whether tools for this service may be published right now.
    pub fn is_publishable(&self) -> bool {
        self.approval == ApprovalStatus::Approved && self.is_online()
    }
}
