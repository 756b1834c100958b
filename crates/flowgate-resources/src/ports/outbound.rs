//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the attribute engine. The host application picks
//! the implementation.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::identity::{ResourceKey, ResourceRecord};

/// Key-based persistence for override records.
///
/// Production: any durable store behind this trait
/// Development: `FileAttributeStore`
/// Testing: `InMemoryAttributeStore`
///
/// Writes to the same key must be atomic with respect to each other; the
/// engine relies on that for same-identity serialization.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Fetch the payload stored under `key`, or `StoreError::NotFound`.
    async fn get(&self, key: &ResourceKey) -> Result<Vec<u8>, StoreError>;

    /// Insert or fully replace a record.
    async fn put(&self, record: ResourceRecord) -> Result<(), StoreError>;

    /// Remove the record under `key`, or `StoreError::NotFound`.
    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError>;
}
