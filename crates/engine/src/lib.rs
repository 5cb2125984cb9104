// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! canopy-engine: the asynchronous resource-operation engine
//!
//! Turns a synchronous create/update/delete request into a durable,
//! retryable background operation. The [`OperationEngine`] admits one
//! operation per resource at a time, drives it through its state machine
//! on a bounded worker pool, and exposes progress for polling. The
//! [`DeploymentProcessor`] orchestrates a single operation: driver
//! selection, dependency resolution, output persistence, and compensating
//! deletes on partial failure.

mod deployment;
mod engine;
mod error;
mod inflight;
mod retry;

pub use deployment::DeploymentProcessor;
pub use engine::OperationEngine;
pub use error::{DeployError, EngineError};
pub use inflight::{InflightGuard, InflightSet};
pub use retry::RetryPolicy;
