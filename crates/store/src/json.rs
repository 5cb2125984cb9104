//! JSON file-based store
//!
//! One directory per resource id (the id is already a safe relative path:
//! parsing rejects empty and dot segments), one `record.json` per record.
//! Version checks and writes run under a process-wide write lock so the
//! compare-and-swap is atomic within this process.

use crate::{Precondition, ResourceStore, StoreError, Version, VersionedRecord};
use async_trait::async_trait;
use canopy_core::{OperationId, OperationRecord, ResourceId, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const RECORD_FILE: &str = "record.json";

/// On-disk envelope pairing a record with its version token
#[derive(Debug, Serialize, Deserialize)]
struct StoredResource {
    version: u64,
    record: ResourceRecord,
}

/// JSON file-based resource store
#[derive(Clone)]
pub struct JsonStore {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonStore {
    /// Open a store rooted at the given directory
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn resource_dir(&self, id: &ResourceId) -> PathBuf {
        let mut dir = self.base_path.join("resources");
        // ids compare case-insensitively, so the path is normalized
        for segment in id.to_string().to_lowercase().split('/') {
            if !segment.is_empty() {
                dir.push(segment);
            }
        }
        dir
    }

    fn operation_path(&self, id: &OperationId) -> PathBuf {
        self.base_path
            .join("operations")
            .join(format!("{}.json", id.0))
    }

    fn read_resource(&self, id: &ResourceId) -> Result<Option<StoredResource>, StoreError> {
        let path = self.resource_dir(id).join(RECORD_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn current_version(stored: &Option<StoredResource>) -> Option<Version> {
        stored.as_ref().map(|s| Version::new(s.version))
    }

    fn collect_records(
        dir: &Path,
        prefix: &ResourceId,
        out: &mut Vec<ResourceRecord>,
    ) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::collect_records(&path, prefix, out)?;
            } else if path.file_name().map(|n| n == RECORD_FILE).unwrap_or(false) {
                let json = fs::read_to_string(&path)?;
                let stored: StoredResource = serde_json::from_str(&json)?;
                if prefix.contains(&stored.record.id) {
                    out.push(stored.record);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for JsonStore {
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<VersionedRecord>, StoreError> {
        let Some(stored) = self.read_resource(id)? else {
            return Ok(None);
        };
        Ok(Some(VersionedRecord {
            version: Version::new(stored.version),
            record: stored.record,
        }))
    }

    async fn put_resource(
        &self,
        record: &ResourceRecord,
        precondition: Precondition,
    ) -> Result<Version, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let stored = self.read_resource(&record.id)?;
        let current = Self::current_version(&stored);
        if !precondition.allows(current) {
            return Err(StoreError::Conflict {
                id: record.id.to_string(),
            });
        }

        let next = current.map(Version::next).unwrap_or_else(Version::initial);
        let path = self.resource_dir(&record.id).join(RECORD_FILE);
        Self::write_json(
            &path,
            &StoredResource {
                version: next.value(),
                record: record.clone(),
            },
        )?;
        Ok(next)
    }

    async fn delete_resource(
        &self,
        id: &ResourceId,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let stored = self.read_resource(id)?;
        let current = Self::current_version(&stored);
        if !precondition.allows(current) {
            return Err(StoreError::Conflict { id: id.to_string() });
        }

        let path = self.resource_dir(id).join(RECORD_FILE);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    async fn list_resources(&self, prefix: &ResourceId) -> Result<Vec<ResourceRecord>, StoreError> {
        let dir = self.resource_dir(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        Self::collect_records(&dir, prefix, &mut records)?;
        Ok(records)
    }

    async fn get_operation(
        &self,
        id: &OperationId,
    ) -> Result<Option<OperationRecord>, StoreError> {
        let path = self.operation_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StoreError> {
        Self::write_json(&self.operation_path(&record.id), record)
    }
}
