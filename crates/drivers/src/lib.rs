// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! canopy-drivers: pluggable recipe driver contract and registry
//!
//! A driver turns a recipe plus parameters into provisioned infrastructure
//! and reports structured outputs. Drivers never talk to the resource
//! store: they are functions of their inputs plus the external
//! provisioning system, which keeps them independently testable with
//! injected fakes.
//!
//! Execute must be safe to call again after a crash with the same inputs.
//! A driver whose provisioning technology is not naturally idempotent is
//! responsible for detecting already-provisioned state and returning the
//! existing output instead of duplicating infrastructure.

use async_trait::async_trait;
use canopy_core::{Classify, ErrorKind, RecipeOutput, RecipeRef, ResourceId};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

mod registry;

pub use registry::{DriverRegistry, RegistryError};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DriverCall, FakeDriver};

/// Everything a driver needs to execute a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    pub resource_id: ResourceId,
    /// Qualified resource type, e.g. `Applications.Core/containers`
    pub resource_type: String,
    pub recipe: RecipeRef,
    /// Input parameters from the resource's declared properties
    pub parameters: Map<String, Value>,
    /// Computed values of referenced resources, keyed by connection name
    pub dependencies: BTreeMap<String, Map<String, Value>>,
    /// Output of a previous successful execution, when re-running
    pub prior_output: Option<RecipeOutput>,
}

/// Everything a driver needs to tear a resource down
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub resource_id: ResourceId,
    /// Previously recorded outputs identifying what to remove
    pub outputs: RecipeOutput,
}

/// Typed driver failure. Transient and timeout failures are retried by
/// the engine; the rest fail the operation immediately. A failure that may
/// have left infrastructure behind carries the partial output so the
/// engine can compensate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("driver call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transient provisioning failure: {reason}")]
    Transient {
        reason: String,
        partial_output: Option<RecipeOutput>,
    },
    #[error("invalid recipe configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error("recipe execution failed: {reason}")]
    Failed {
        reason: String,
        partial_output: Option<RecipeOutput>,
    },
}

impl DriverError {
    pub fn transient(reason: impl Into<String>) -> Self {
        DriverError::Transient {
            reason: reason.into(),
            partial_output: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        DriverError::Failed {
            reason: reason.into(),
            partial_output: None,
        }
    }

    /// Infrastructure that may have been created before the failure
    pub fn partial_output(&self) -> Option<&RecipeOutput> {
        match self {
            DriverError::Transient { partial_output, .. }
            | DriverError::Failed { partial_output, .. } => partial_output.as_ref(),
            _ => None,
        }
    }
}

impl Classify for DriverError {
    fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Timeout(_) | DriverError::Transient { .. } => ErrorKind::Transient,
            DriverError::InvalidConfiguration { .. } | DriverError::Failed { .. } => {
                ErrorKind::Permanent
            }
        }
    }
}

/// Pluggable provisioning executor, one implementation per technology
#[async_trait]
pub trait RecipeDriver: Send + Sync + 'static {
    /// Materialize the recipe. Idempotent or safely re-entrant.
    async fn execute(&self, request: ExecuteRequest) -> Result<RecipeOutput, DriverError>;

    /// Remove what the recipe provisioned. Must succeed as a no-op when
    /// the target no longer exists.
    async fn delete(&self, request: DeleteRequest) -> Result<(), DriverError>;
}

impl std::fmt::Debug for dyn RecipeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn RecipeDriver>")
    }
}
