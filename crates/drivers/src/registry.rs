// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver registry
//!
//! Maps a qualified resource type to a driver instance. Populated once at
//! startup; lookups for unregistered types are an explicit error rather
//! than any dynamic dispatch.

use crate::RecipeDriver;
use canopy_core::{Classify, ErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no driver registered for resource type: {0}")]
    UnknownResourceType(String),
}

impl Classify for RegistryError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Startup-populated mapping from resource type to driver
#[derive(Default)]
pub struct DriverRegistry {
    // keys are lowercased; resource types compare case-insensitively
    drivers: HashMap<String, Arc<dyn RecipeDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver for a qualified resource type, e.g.
    /// `Applications.Core/containers`. Re-registering a type replaces the
    /// previous driver.
    pub fn register(&mut self, resource_type: impl Into<String>, driver: Arc<dyn RecipeDriver>) {
        let resource_type = resource_type.into();
        tracing::debug!(resource_type = %resource_type, "registering recipe driver");
        self.drivers.insert(resource_type.to_lowercase(), driver);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_driver(
        mut self,
        resource_type: impl Into<String>,
        driver: Arc<dyn RecipeDriver>,
    ) -> Self {
        self.register(resource_type, driver);
        self
    }

    pub fn get(&self, resource_type: &str) -> Result<Arc<dyn RecipeDriver>, RegistryError> {
        self.drivers
            .get(&resource_type.to_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::UnknownResourceType(resource_type.to_string()))
    }

    pub fn is_registered(&self, resource_type: &str) -> bool {
        self.drivers.contains_key(&resource_type.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDriver;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = DriverRegistry::new()
            .with_driver("Applications.Core/containers", Arc::new(FakeDriver::new()));

        assert!(registry.get("applications.core/CONTAINERS").is_ok());
        assert!(registry.is_registered("Applications.Core/containers"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_type_is_an_explicit_error() {
        let registry = DriverRegistry::new();
        let err = registry.get("Applications.Core/gadgets").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownResourceType("Applications.Core/gadgets".into())
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn reregistering_replaces_the_driver() {
        let first = FakeDriver::new();
        let second = FakeDriver::new();
        let mut registry = DriverRegistry::new();
        registry.register("P.N/things", Arc::new(first.clone()));
        registry.register("p.n/THINGS", Arc::new(second.clone()));

        assert_eq!(registry.len(), 1);

        // the replacement driver answers lookups now
        let looked_up = registry.get("P.N/things").unwrap();
        let id = canopy_core::ResourceId::parse("/subscriptions/s/providers/P.N/things/t").unwrap();
        looked_up
            .execute(crate::ExecuteRequest {
                resource_id: id,
                resource_type: "P.N/things".into(),
                recipe: canopy_core::RecipeRef::new("r"),
                parameters: Default::default(),
                dependencies: Default::default(),
                prior_output: None,
            })
            .await
            .unwrap();

        assert_eq!(first.execute_calls(), 0);
        assert_eq!(second.execute_calls(), 1);
    }
}
