use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::errors::StoreError;
use crate::domain::identity::{ResourceKey, ResourceRecord};
use crate::ports::outbound::AttributeStore;

/// In-memory attribute store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryAttributeStore {
    data: RwLock<HashMap<ResourceKey, Vec<u8>>>,
}

impl InMemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl AttributeStore for InMemoryAttributeStore {
    async fn get(&self, key: &ResourceKey) -> Result<Vec<u8>, StoreError> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, record: ResourceRecord) -> Result<(), StoreError> {
        self.data.write().insert(record.key, record.payload);
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.data
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
