// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter-facing error payload
//!
//! The request adapter owns HTTP; the core owns the payload shape and the
//! pure mapping from an error's kind to it. Validation failures carry an
//! ordered list of sub-errors, each with a field/position target.

use crate::error::{Classify, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One error entry: a code, a message, an optional field/position target,
/// and ordered sub-errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    /// A validation sub-error anchored to a field or document position
    pub fn validation(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorKind::Validation.code().to_string(),
            message: message.into(),
            target: Some(target.into()),
            details: Vec::new(),
        }
    }

    /// Capture any classified error
    pub fn from_error<E: Classify + fmt::Display>(err: &E) -> Self {
        Self::new(err.kind().code(), err.to_string())
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }
}

/// Top-level error payload returned by the request adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail::new(kind.code(), message),
        }
    }

    /// The pure error → payload mapping used at the adapter boundary
    pub fn from_error<E: Classify + fmt::Display>(err: &E) -> Self {
        Self {
            error: ErrorDetail::from_error(err),
        }
    }

    /// A validation payload with per-field sub-errors, in input order
    pub fn validation(message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self {
            error: ErrorDetail::new(ErrorKind::Validation.code(), message).with_details(details),
        }
    }
}
