//! Method signature metadata for registry-discovered RPC services.
//!
//! This crate provides:
//! - The type mapper from RPC type identifiers to JSON-Schema kinds.
//! - A pluggable type descriptor provider with an in-memory registry.
//! - A persisted metadata store abstraction with an in-memory implementation.
//! - The tiered signature resolver (introspection, persisted metadata,
//!   name heuristics) with an explicit cache.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Startup catalog loading.
pub mod catalog;
pub mod definition;
pub mod heuristic;
pub mod introspect;
pub mod resolve;
/// Persisted metadata lookups.
pub mod store;
pub mod type_mapper;
/// Signature, parameter, and type descriptors.
pub mod types;

pub use catalog::{CatalogMethod, CatalogService, CatalogStats, MetadataCatalog};
pub use definition::ServiceDefinition;
pub use heuristic::{EntityTypes, HeuristicOptions, HeuristicTier};
pub use introspect::{collect_fields, TypeDescriptorProvider, TypeRegistry};
pub use resolve::{
    IntrospectionTier, PersistedMetadataTier, ResolutionTier, ResolverBuilder, SignatureResolver,
};
pub use store::{MemMetadataStore, MetadataStore, MethodRow, ServiceRow, StoreError};
pub use type_mapper::{categorize, CollectionFlavor, JsonKind, PrimitiveKind, TypeCategory};
pub use types::{
    signature_key, DeclaredParameter, FieldDescriptor, InterfaceDescriptor, MethodDefinition,
    MethodDescriptor, ParameterDescriptor, ResolvedSignature, SignatureSource, TypeDescriptor,
};
