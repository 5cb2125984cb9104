// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! canopy-store: durable keyed storage for resource and operation records
//!
//! The store is the single source of truth and the only point of
//! cross-worker coordination. Resource writes are guarded by optimistic
//! concurrency: every successful write bumps the record's version token,
//! and a write carrying a stale token fails with a conflict. Writes are
//! atomic per record; nothing here spans records.

use async_trait::async_trait;
use canopy_core::{Classify, ErrorKind, OperationId, OperationRecord, ResourceId, ResourceRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Monotonic version token for a resource record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version assigned by the first successful write
    pub fn initial() -> Self {
        Version(1)
    }

    pub fn new(value: u64) -> Self {
        Version(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }

    /// ETag rendering used at the adapter boundary
    pub fn etag(self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write precondition, checked atomically with the write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write
    Any,
    /// The record must not exist yet
    NotExists,
    /// The record must currently carry exactly this version
    Matches(Version),
}

impl Precondition {
    /// Whether a write may proceed against the current version
    pub fn allows(self, current: Option<Version>) -> bool {
        match self {
            Precondition::Any => true,
            Precondition::NotExists => current.is_none(),
            Precondition::Matches(expected) => current == Some(expected),
        }
    }
}

/// A resource record together with its current version token
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord {
    pub record: ResourceRecord,
    pub version: Version,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("version conflict writing {id}")]
    Conflict { id: String },
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::Io(_) | StoreError::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Narrow read/write contract the engine depends on.
///
/// Implementations must make `put_resource`/`delete_resource` atomic with
/// their precondition check. Operation records are engine-owned and
/// written last-writer-wins.
#[async_trait]
pub trait ResourceStore: Clone + Send + Sync + 'static {
    /// Fetch a record and its version; `None` if absent
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<VersionedRecord>, StoreError>;

    /// Write a record if the precondition holds, returning the new version
    async fn put_resource(
        &self,
        record: &ResourceRecord,
        precondition: Precondition,
    ) -> Result<Version, StoreError>;

    /// Remove a record if the precondition holds. Deleting an absent
    /// record with `Precondition::Any` is a no-op.
    async fn delete_resource(
        &self,
        id: &ResourceId,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// All records whose id is contained by `prefix` (the prefix record
    /// itself included, when present)
    async fn list_resources(&self, prefix: &ResourceId) -> Result<Vec<ResourceRecord>, StoreError>;

    async fn get_operation(&self, id: &OperationId)
        -> Result<Option<OperationRecord>, StoreError>;

    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StoreError>;
}
