// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use canopy_core::{Classify, ErrorKind, OperationId, ResourceId};
use canopy_drivers::{DriverError, RegistryError};
use canopy_store::StoreError;
use thiserror::Error;

/// Failures from a single deploy/delete attempt
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("resource not found: {0}")]
    NotFound(ResourceId),
    #[error("dependency not provisioned: {0}")]
    MissingDependency(ResourceId),
    #[error("invalid connection {name}: {reason}")]
    InvalidConnection { name: String, reason: String },
    #[error("version conflict persisting output for {0}")]
    OutputConflict(ResourceId),
}

impl Classify for DeployError {
    fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Registry(e) => e.kind(),
            DeployError::Driver(e) => e.kind(),
            DeployError::Store(e) => e.kind(),
            DeployError::NotFound(_)
            | DeployError::MissingDependency(_)
            | DeployError::InvalidConnection { .. } => ErrorKind::Validation,
            DeployError::OutputConflict(_) => ErrorKind::Conflict,
        }
    }
}

/// Failures surfaced by the operation engine's public surface
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("an operation is already in flight for {0}")]
    OperationInFlight(ResourceId),
    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    #[error("resource properties must be a JSON object")]
    InvalidProperties,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl Classify for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            EngineError::OperationInFlight(_) => ErrorKind::Conflict,
            EngineError::OperationNotFound(_)
            | EngineError::ResourceNotFound(_)
            | EngineError::InvalidProperties => ErrorKind::Validation,
            EngineError::Store(e) => e.kind(),
            EngineError::Deploy(e) => e.kind(),
        }
    }
}
