// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation engine
//!
//! The scheduler: admits operation requests, serializes concurrent
//! operations on the same resource, drives each operation through its
//! state machine on a bounded pool of workers, retries transient failures
//! with exponential backoff, and exposes status for polling.
//!
//! Enqueue is the only admission point. It claims the per-resource
//! in-flight guard before any work is scheduled; the guard is released
//! when the operation reaches a terminal state, which makes operations on
//! different resources fully parallel while the same resource is
//! serialized.

use crate::deployment::DeploymentProcessor;
use crate::error::{DeployError, EngineError};
use crate::inflight::{InflightGuard, InflightSet};
use crate::retry::RetryPolicy;
use canopy_core::{
    Classify, EngineConfig, ErrorDetail, IdGen, OperationEvent, OperationId, OperationKind,
    OperationRecord, ProvisioningState, ResourceId, ResourceRecord, ResourceSpec, UuidIdGen,
};
use canopy_drivers::DriverRegistry;
use canopy_store::{Precondition, ResourceStore};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Best-effort cancellation flags, observed at safe checkpoints
#[derive(Clone, Default)]
struct CancelSet {
    inner: Arc<Mutex<HashSet<OperationId>>>,
}

impl CancelSet {
    fn request(&self, id: &OperationId) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone());
    }

    /// Consume a pending cancellation for the operation
    fn take(&self, id: &OperationId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }

    fn discard(&self, id: &OperationId) {
        self.take(id);
    }
}

/// Accepts operation requests and drives them to completion
#[derive(Clone)]
pub struct OperationEngine<S: ResourceStore, G: IdGen = UuidIdGen> {
    store: S,
    processor: Arc<DeploymentProcessor<S>>,
    retry: RetryPolicy,
    inflight: InflightSet,
    cancellations: CancelSet,
    permits: Arc<Semaphore>,
    ids: G,
}

impl<S: ResourceStore> OperationEngine<S, UuidIdGen> {
    pub fn new(store: S, registry: Arc<DriverRegistry>, config: EngineConfig) -> Self {
        let processor = Arc::new(DeploymentProcessor::new(
            store.clone(),
            registry,
            config.driver_timeout,
        ));
        Self {
            store,
            processor,
            retry: RetryPolicy::from_config(&config),
            inflight: InflightSet::new(),
            cancellations: CancelSet::default(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_operations.max(1))),
            ids: UuidIdGen,
        }
    }
}

impl<S: ResourceStore, G: IdGen + 'static> OperationEngine<S, G> {
    /// Swap the id generator, for deterministic operation ids in tests
    pub fn with_id_gen<G2: IdGen + 'static>(self, ids: G2) -> OperationEngine<S, G2> {
        OperationEngine {
            store: self.store,
            processor: self.processor,
            retry: self.retry,
            inflight: self.inflight,
            cancellations: self.cancellations,
            permits: self.permits,
            ids,
        }
    }

    /// Admit a create-or-update operation. Persists the declared spec,
    /// then schedules deployment; returns the operation id for polling.
    pub async fn enqueue_create_or_update(
        &self,
        id: &ResourceId,
        spec: ResourceSpec,
    ) -> Result<OperationId, EngineError> {
        if !spec.properties.is_object() {
            return Err(EngineError::InvalidProperties);
        }
        let guard = self.admit(id)?;

        match self.store.get_resource(id).await? {
            Some(current) => {
                let mut record = current.record.with_spec(spec);
                record.mark(ProvisioningState::Provisioning);
                self.store
                    .put_resource(&record, Precondition::Matches(current.version))
                    .await?;
            }
            None => {
                let mut record = ResourceRecord::new(id.clone(), spec);
                record.mark(ProvisioningState::Provisioning);
                self.store
                    .put_resource(&record, Precondition::NotExists)
                    .await?;
            }
        }

        self.schedule(OperationKind::CreateOrUpdate, id, guard).await
    }

    /// Admit a delete operation for an existing resource
    pub async fn enqueue_delete(&self, id: &ResourceId) -> Result<OperationId, EngineError> {
        let guard = self.admit(id)?;

        let Some(current) = self.store.get_resource(id).await? else {
            return Err(EngineError::ResourceNotFound(id.clone()));
        };
        let mut record = current.record;
        record.mark(ProvisioningState::Deleting);
        self.store
            .put_resource(&record, Precondition::Matches(current.version))
            .await?;

        self.schedule(OperationKind::Delete, id, guard).await
    }

    /// Latest persisted snapshot of an operation; non-blocking
    pub async fn get_status(&self, id: &OperationId) -> Result<OperationRecord, EngineError> {
        self.store
            .get_operation(id)
            .await?
            .ok_or_else(|| EngineError::OperationNotFound(id.clone()))
    }

    /// Request cancellation. Observed at the next safe checkpoint between
    /// driver calls; an in-flight driver call is allowed to finish so no
    /// infrastructure is orphaned. Canceling a finished operation is a
    /// no-op.
    pub async fn cancel(&self, id: &OperationId) -> Result<(), EngineError> {
        let op = self.get_status(id).await?;
        if op.is_terminal() {
            return Ok(());
        }
        tracing::info!(operation = %id, "cancellation requested");
        self.cancellations.request(id);
        Ok(())
    }

    /// Synchronous read of a resource, secrets excluded
    pub async fn get_resource(
        &self,
        id: &ResourceId,
    ) -> Result<Option<ResourceRecord>, EngineError> {
        Ok(self
            .store
            .get_resource(id)
            .await?
            .map(|v| v.record.read_view()))
    }

    /// Synchronous listing of the resources contained by `prefix`,
    /// secrets excluded
    pub async fn list_resources(
        &self,
        prefix: &ResourceId,
    ) -> Result<Vec<ResourceRecord>, EngineError> {
        Ok(self
            .store
            .list_resources(prefix)
            .await?
            .into_iter()
            .map(|r| r.read_view())
            .collect())
    }

    /// Sensitive values for a resource, only ever returned over this path
    pub async fn fetch_secrets(&self, id: &ResourceId) -> Result<Map<String, Value>, EngineError> {
        let Some(current) = self.store.get_resource(id).await? else {
            return Err(EngineError::ResourceNotFound(id.clone()));
        };
        Ok(self.processor.fetch_secrets(id, &current.record).await?)
    }

    fn admit(&self, id: &ResourceId) -> Result<InflightGuard, EngineError> {
        self.inflight
            .try_acquire(id)
            .ok_or_else(|| EngineError::OperationInFlight(id.clone()))
    }

    async fn schedule(
        &self,
        kind: OperationKind,
        id: &ResourceId,
        guard: InflightGuard,
    ) -> Result<OperationId, EngineError> {
        let op = OperationRecord::new(self.ids.next(), id.clone(), kind);
        self.store.put_operation(&op).await?;
        tracing::info!(operation = %op.id, resource = %id, ?kind, "operation accepted");

        let op_id = op.id.clone();
        let engine = self.clone();
        tokio::spawn(async move { engine.run_operation(op, guard).await });
        Ok(op_id)
    }

    /// Worker body for one operation. Holds the in-flight guard until the
    /// operation reaches a terminal state.
    async fn run_operation(self, mut op: OperationRecord, guard: InflightGuard) {
        let _guard = guard;
        let Ok(_permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // the semaphore is never closed
            return;
        };

        if self.cancellations.take(&op.id) {
            op = op.transition(OperationEvent::Cancel);
            self.finish(op).await;
            return;
        }

        op = op.transition(OperationEvent::Start);
        self.persist_operation(&op).await;

        loop {
            op.attempts += 1;
            self.persist_operation(&op).await;

            match self.attempt(&op).await {
                Ok(()) => {
                    op = op.transition(OperationEvent::Succeed);
                    break;
                }
                Err(err) if err.is_retryable() && self.retry.should_retry(op.attempts) => {
                    let delay = self.retry.delay(op.attempts);
                    tracing::warn!(
                        operation = %op.id,
                        resource = %op.resource_id,
                        attempt = op.attempts,
                        error = %err,
                        ?delay,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    if self.cancellations.take(&op.id) {
                        op = op.transition(OperationEvent::Cancel);
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(
                        operation = %op.id,
                        resource = %op.resource_id,
                        attempt = op.attempts,
                        error = %err,
                        "operation failed"
                    );
                    self.mark_resource_failed(&op.resource_id).await;
                    op = op.transition(OperationEvent::Fail {
                        error: ErrorDetail::from_error(&err),
                    });
                    break;
                }
            }
        }

        self.finish(op).await;
    }

    /// One deployment attempt against the freshest persisted record
    async fn attempt(&self, op: &OperationRecord) -> Result<(), DeployError> {
        let Some(current) = self.store.get_resource(&op.resource_id).await? else {
            return Err(DeployError::NotFound(op.resource_id.clone()));
        };
        match op.kind {
            OperationKind::CreateOrUpdate => {
                self.processor.deploy(&op.resource_id, &current.record).await
            }
            OperationKind::Delete => self.processor.delete(&op.resource_id, &current.record).await,
        }
    }

    async fn finish(&self, op: OperationRecord) {
        self.cancellations.discard(&op.id);
        tracing::info!(
            operation = %op.id,
            resource = %op.resource_id,
            status = ?op.status,
            "operation finished"
        );
        self.persist_operation(&op).await;
    }

    async fn persist_operation(&self, op: &OperationRecord) {
        if let Err(err) = self.store.put_operation(op).await {
            // losing a status write must not crash the worker holding the
            // in-flight guard; the failure is an outage signal
            tracing::error!(operation = %op.id, error = %err, "failed to persist operation record");
        }
    }

    async fn mark_resource_failed(&self, id: &ResourceId) {
        match self.store.get_resource(id).await {
            Ok(Some(current)) => {
                let mut record = current.record;
                record.mark(ProvisioningState::Failed);
                if let Err(err) = self
                    .store
                    .put_resource(&record, Precondition::Matches(current.version))
                    .await
                {
                    tracing::error!(resource = %id, error = %err, "failed to record failure state");
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(resource = %id, error = %err, "failed to read resource after failure")
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
