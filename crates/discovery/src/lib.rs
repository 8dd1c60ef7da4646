//! Service identity and provider tracking for registry-discovered RPC services.
//!
//! This crate provides:
//! - `ServiceKey`, the `interface:version:group` identity of a service.
//! - `ProviderEvent`, the add/remove feed emitted by a registry watcher.
//! - `ServiceCatalog`, which applies events and reports online transitions.
//! - Parsing of provider node paths from a ZooKeeper-style tree.
//!
//! # Examples
//!
//! ```
//! use zkmcp_discovery::{ProviderEvent, ProviderInfo, ServiceCatalog, ServiceKey, Transition};
//!
//! let catalog = ServiceCatalog::new();
//! let key = ServiceKey::new("com.example.UserService");
//! let event = ProviderEvent::Added(ProviderInfo::new(key.clone(), "10.0.0.1:20880"));
//!
//! assert_eq!(catalog.apply(&event), Transition::WentOnline);
//! assert_eq!(catalog.online_count(&key), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Live catalog of discovered services.
pub mod catalog;
/// Service keys, provider events, and descriptors.
pub mod types;
pub mod zkpath;

pub use catalog::{ServiceCatalog, Transition};
pub use types::{
    ApprovalStatus, ProviderEvent, ProviderInfo, ServiceDescriptor, ServiceKey, DEFAULT_PROTOCOL,
    DEFAULT_SEGMENT,
};
pub use zkpath::{event_from_path, parse_provider_path, PathParseError};
