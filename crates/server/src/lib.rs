//! This crate wires the `zkmcp` bridge together: discovery events and approval
//! decisions go in, MCP tool definitions come out.
//!
//! The main entry point is the [`run`] function used by the `zkmcp` binary.
//! [`Bridge`] is the embeddable core; it publishes through any
//! [`ToolRegistry`], with [`InMemoryToolRegistry`] as the in-process
//! implementation holding `rmcp` tool models.
//!
//! ```
//! use std::sync::Arc;
//! use zkmcp_discovery::{ProviderEvent, ProviderInfo, ServiceKey};
//! use zkmcp_server::{Bridge, BridgeOptions, InMemoryToolRegistry, MetadataSources};
//! use zkmcp_state::ApprovalRequest;
//!
//! let registry = Arc::new(InMemoryToolRegistry::new());
//! let bridge = Bridge::new(registry.clone(), MetadataSources::default(), BridgeOptions::default());
//!
//! let key = ServiceKey::new("com.acme.UserService");
//! bridge.handle_event(&ProviderEvent::Added(
//!     ProviderInfo::new(key.clone(), "10.0.0.1:20880").with_methods(["getUserById"]),
//! ));
//! let id = bridge.create_approval(ApprovalRequest::new(key)).unwrap().record.id;
//! bridge.approve(id, "admin", None).unwrap();
//!
//! assert_eq!(registry.list_tools()[0].name, "com.acme.UserService.getUserById");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod app;
pub mod bridge;
pub mod catalog;
pub mod cli;
mod commands;
pub mod config;
pub mod feed;
pub mod publisher;
pub mod registry;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use app::run;
pub use bridge::{
    ApprovalOutcome, Bridge, BridgeError, BridgeOptions, MetadataSources, PreparedCall,
    PublishReport, ReconcileReport,
};
pub use feed::{parse_feed_line, FeedError};
pub use publisher::{PublishError, PublishOutcome, ToolPublisher, ToolRegistry};
pub use registry::{InMemoryToolRegistry, RegistryOp};
pub use tools::to_mcp_tool;
