// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment processor
//!
//! Orchestrates the lifecycle of a single resource operation: selects a
//! driver, builds its request from the declared properties and any
//! dependency outputs already persisted for referenced resources, invokes
//! it under a deadline, persists results, and issues a compensating delete
//! when a failed execution left partial infrastructure behind.

use crate::error::DeployError;
use canopy_core::{ProvisioningState, RecipeOutput, ResourceId, ResourceRecord};
use canopy_drivers::{DeleteRequest, DriverError, DriverRegistry, ExecuteRequest, RecipeDriver};
use canopy_store::{Precondition, ResourceStore, StoreError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub struct DeploymentProcessor<S: ResourceStore> {
    store: S,
    registry: Arc<DriverRegistry>,
    driver_timeout: Duration,
}

impl<S: ResourceStore> DeploymentProcessor<S> {
    pub fn new(store: S, registry: Arc<DriverRegistry>, driver_timeout: Duration) -> Self {
        Self {
            store,
            registry,
            driver_timeout,
        }
    }

    /// Provision the resource and persist the recipe output.
    ///
    /// On failure, any partial infrastructure the driver reported is
    /// compensated with a delete before the original error propagates, so
    /// a failed create leaves nothing orphaned and nothing half-persisted.
    pub async fn deploy(&self, id: &ResourceId, record: &ResourceRecord) -> Result<(), DeployError> {
        let resource_type = id.resource_type();
        let driver = self.registry.get(&resource_type)?;
        let dependencies = self.resolve_dependencies(record).await?;

        let prior = record.recorded_output();
        let request = ExecuteRequest {
            resource_id: id.clone(),
            resource_type,
            recipe: record.recipe.clone(),
            parameters: record.properties.as_object().cloned().unwrap_or_default(),
            dependencies,
            prior_output: (!prior.is_empty()).then_some(prior),
        };

        tracing::debug!(resource = %id, recipe = %record.recipe, "executing recipe");
        let output = match timeout(self.driver_timeout, driver.execute(request)).await {
            Err(_) => return Err(DriverError::Timeout(self.driver_timeout).into()),
            Ok(Err(err)) => {
                if let Some(partial) = err.partial_output() {
                    self.compensate(driver.as_ref(), id, partial).await;
                }
                return Err(err.into());
            }
            Ok(Ok(output)) => output,
        };

        self.persist_output(id, &output).await
    }

    /// Tear the resource down and remove its record.
    ///
    /// The record is removed only after the driver reports success; a
    /// driver failure leaves it intact so the delete can be retried.
    pub async fn delete(&self, id: &ResourceId, record: &ResourceRecord) -> Result<(), DeployError> {
        let driver = self.registry.get(&id.resource_type())?;

        let Some(current) = self.store.get_resource(id).await? else {
            // already gone; drivers treat missing targets the same way
            return Ok(());
        };

        let request = DeleteRequest {
            resource_id: id.clone(),
            outputs: record.recorded_output(),
        };

        tracing::debug!(resource = %id, "deleting provisioned infrastructure");
        match timeout(self.driver_timeout, driver.delete(request)).await {
            Err(_) => return Err(DriverError::Timeout(self.driver_timeout).into()),
            Ok(Err(err)) => return Err(err.into()),
            Ok(Ok(())) => {}
        }

        self.store
            .delete_resource(id, Precondition::Matches(current.version))
            .await?;
        Ok(())
    }

    /// Sensitive connection values for an existing resource, without
    /// re-provisioning. Empty map when the recipe defines no secrets.
    pub async fn fetch_secrets(
        &self,
        id: &ResourceId,
        record: &ResourceRecord,
    ) -> Result<Map<String, Value>, DeployError> {
        tracing::debug!(resource = %id, count = record.secrets.len(), "fetching secrets");
        Ok(record.secrets.clone())
    }

    /// Resolve `connections.{name}.source` references to the computed
    /// values already persisted for those resources. Ordering across
    /// resources is the caller's responsibility; an unprovisioned
    /// dependency fails the attempt.
    async fn resolve_dependencies(
        &self,
        record: &ResourceRecord,
    ) -> Result<BTreeMap<String, Map<String, Value>>, DeployError> {
        let mut dependencies = BTreeMap::new();
        for (name, source) in record.connection_sources() {
            let Some(source) = source.as_str() else {
                return Err(DeployError::InvalidConnection {
                    name: name.to_string(),
                    reason: "source must be a resource id string".to_string(),
                });
            };
            let dep_id =
                ResourceId::parse(source).map_err(|e| DeployError::InvalidConnection {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;

            let Some(dep) = self.store.get_resource(&dep_id).await? else {
                return Err(DeployError::MissingDependency(dep_id));
            };
            if dep.record.provisioning_state != ProvisioningState::Provisioned {
                return Err(DeployError::MissingDependency(dep_id));
            }

            dependencies.insert(name.to_string(), dep.record.computed_values.clone());
        }
        Ok(dependencies)
    }

    /// Best-effort compensating delete for partially created
    /// infrastructure. The original failure always wins; a compensation
    /// failure is logged for operator follow-up.
    async fn compensate(&self, driver: &dyn RecipeDriver, id: &ResourceId, partial: &RecipeOutput) {
        tracing::warn!(resource = %id, "compensating partially failed deployment");
        let request = DeleteRequest {
            resource_id: id.clone(),
            outputs: partial.clone(),
        };
        match timeout(self.driver_timeout, driver.delete(request)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(resource = %id, error = %err, "compensating delete failed")
            }
            Err(_) => tracing::error!(resource = %id, "compensating delete timed out"),
        }
    }

    /// Persist computed values and the secret projection under the
    /// expected version. A single benign version race is absorbed by
    /// re-reading; a second conflict surfaces to the caller.
    async fn persist_output(&self, id: &ResourceId, output: &RecipeOutput) -> Result<(), DeployError> {
        let mut retried = false;
        loop {
            let Some(current) = self.store.get_resource(id).await? else {
                return Err(DeployError::NotFound(id.clone()));
            };

            let mut record = current.record;
            record.apply_output(output);

            match self
                .store
                .put_resource(&record, Precondition::Matches(current.version))
                .await
            {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict { .. }) if !retried => {
                    tracing::debug!(resource = %id, "version race persisting output, retrying");
                    retried = true;
                }
                Err(StoreError::Conflict { .. }) => {
                    return Err(DeployError::OutputConflict(id.clone()))
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod tests;
