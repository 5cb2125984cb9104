// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests and embedded use

use crate::{Precondition, ResourceStore, StoreError, Version, VersionedRecord};
use async_trait::async_trait;
use canopy_core::{OperationId, OperationRecord, ResourceId, ResourceRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    resources: HashMap<ResourceId, VersionedRecord>,
    operations: HashMap<OperationId, OperationRecord>,
}

/// Shared in-memory store with the same compare-and-swap semantics as the
/// file-backed store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored resource records
    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<VersionedRecord>, StoreError> {
        Ok(self.lock().resources.get(id).cloned())
    }

    async fn put_resource(
        &self,
        record: &ResourceRecord,
        precondition: Precondition,
    ) -> Result<Version, StoreError> {
        let mut state = self.lock();
        let current = state.resources.get(&record.id).map(|v| v.version);
        if !precondition.allows(current) {
            return Err(StoreError::Conflict {
                id: record.id.to_string(),
            });
        }

        let next = current.map(Version::next).unwrap_or_else(Version::initial);
        state.resources.insert(
            record.id.clone(),
            VersionedRecord {
                record: record.clone(),
                version: next,
            },
        );
        Ok(next)
    }

    async fn delete_resource(
        &self,
        id: &ResourceId,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let current = state.resources.get(id).map(|v| v.version);
        if !precondition.allows(current) {
            return Err(StoreError::Conflict { id: id.to_string() });
        }
        state.resources.remove(id);
        Ok(())
    }

    async fn list_resources(&self, prefix: &ResourceId) -> Result<Vec<ResourceRecord>, StoreError> {
        Ok(self
            .lock()
            .resources
            .values()
            .filter(|v| prefix.contains(&v.record.id))
            .map(|v| v.record.clone())
            .collect())
    }

    async fn get_operation(
        &self,
        id: &OperationId,
    ) -> Result<Option<OperationRecord>, StoreError> {
        Ok(self.lock().operations.get(id).cloned())
    }

    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StoreError> {
        self.lock().operations.insert(record.id.clone(), record.clone());
        Ok(())
    }
}
