//! # Resource Attribute Engine
//!
//! Stores and resolves hierarchical configuration overrides ("matchable
//! attributes") for the admin API. An override is addressed by a
//! [`ResourceIdentity`] and stored as an opaque, protobuf-encoded record.
//!
//! ## Granularities
//!
//! ```text
//!   project/domain                      ── project_domain_attributes
//!   project/domain/workflow             ── workflow_attributes
//!   project/domain/workflow/launch_plan ── launch_plan_attributes
//! ```
//!
//! Every level goes through the same key-based contract; only the populated
//! identity fields differ. Lookups are exact match. A workflow-level `get`
//! never falls back to the project/domain record.
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Required scope | `project` and `domain` are non-empty |
//! | Exact identity | Records differing in any identity field are independent |
//! | Typed payload | The resource type selects the decode schema |
//! | Full replacement | `upsert` overwrites, it never merges |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Identities, typed attributes, errors
//! - `ports/` - `AttributeStore` outbound port
//! - `adapters/` - In-memory and file-backed stores
//! - `service.rs` - `ResourceManager`, the request-shaped API
//!
//! ## Usage
//!
//! ```ignore
//! use flowgate_resources::{MatchingAttributes, ResourceIdentity, ResourceManager, ResourceType};
//!
//! let manager = ResourceManager::in_memory();
//! let id = ResourceIdentity::workflow("p", "d", "w", ResourceType::ExecutionQueue)?;
//! manager.upsert(&id, &attributes).await?;
//! let stored = manager.get(&id).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::storage::{FileAttributeStore, InMemoryAttributeStore};
pub use domain::attributes::MatchingAttributes;
pub use domain::errors::{ResourceError, StoreError};
pub use domain::identity::{ResourceIdentity, ResourceKey, ResourceRecord, ResourceType};
pub use ports::outbound::AttributeStore;
pub use service::{Resource, ResourceManager, ResourceRequest};
