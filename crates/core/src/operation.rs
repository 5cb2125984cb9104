// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation record state machine
//!
//! An operation tracks one asynchronous create-or-update or delete attempt
//! against a single resource. Terminal states are absorbing: once an
//! operation succeeds, fails, or is canceled, no event changes it.

use crate::resource_id::ResourceId;
use crate::response::ErrorDetail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        OperationId(s)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        OperationId(s.to_string())
    }
}

/// What the operation does to its target resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    CreateOrUpdate,
    Delete,
}

/// Status of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Admitted, waiting for a worker
    Accepted,
    /// A worker is driving the deployment
    Provisioning,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed | OperationStatus::Canceled
        )
    }
}

/// Events that can change operation state
#[derive(Clone, Debug)]
pub enum OperationEvent {
    /// A worker picked the operation up
    Start,
    /// Deployment finished successfully
    Succeed,
    /// Deployment failed after retries were exhausted or permanently
    Fail { error: ErrorDetail },
    /// Cancellation observed at a safe checkpoint
    Cancel,
}

/// One asynchronous unit of work against one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    pub resource_id: ResourceId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    /// Error detail recorded when the operation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Deployment attempts made so far
    #[serde(default)]
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    /// Create a new operation in the Accepted state
    pub fn new(id: impl Into<OperationId>, resource_id: ResourceId, kind: OperationKind) -> Self {
        Self {
            id: id.into(),
            resource_id,
            kind,
            status: OperationStatus::Accepted,
            error: None,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pure transition function - returns the record after the event.
    /// Events that are illegal in the current state leave the record
    /// unchanged.
    pub fn transition(&self, event: OperationEvent) -> OperationRecord {
        let now = Utc::now();

        match (self.status, event) {
            (OperationStatus::Accepted, OperationEvent::Start) => OperationRecord {
                status: OperationStatus::Provisioning,
                started_at: Some(now),
                ..self.clone()
            },

            (OperationStatus::Provisioning, OperationEvent::Succeed) => OperationRecord {
                status: OperationStatus::Succeeded,
                ended_at: Some(now),
                ..self.clone()
            },

            (OperationStatus::Provisioning, OperationEvent::Fail { error }) => OperationRecord {
                status: OperationStatus::Failed,
                error: Some(error),
                ended_at: Some(now),
                ..self.clone()
            },

            (OperationStatus::Accepted | OperationStatus::Provisioning, OperationEvent::Cancel) => {
                OperationRecord {
                    status: OperationStatus::Canceled,
                    ended_at: Some(now),
                    ..self.clone()
                }
            }

            // terminal states absorb everything, and out-of-order events
            // (e.g. Succeed before Start) are ignored
            _ => self.clone(),
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
