// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe value types shared between the engine and drivers
//!
//! A recipe is a named, versioned provisioning template. Drivers execute a
//! recipe and report a [`RecipeOutput`]; the engine merges that output into
//! the resource record. Secret values ride in their own field and are kept
//! out of `Debug` output so a logged output can never leak them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a provisioning template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RecipeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Result of a successful recipe execution
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeOutput {
    /// Computed values, merged into the resource record's computed
    /// properties
    #[serde(default)]
    pub values: Map<String, Value>,
    /// Sensitive values, merged into the record's secret projection only
    #[serde(default)]
    pub secrets: Map<String, Value>,
    /// References to the infrastructure the recipe provisioned, used for
    /// cleanup tracking
    #[serde(default)]
    pub resources: Vec<String>,
}

impl RecipeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, reference: impl Into<String>) -> Self {
        self.resources.push(reference.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.secrets.is_empty() && self.resources.is_empty()
    }
}

impl fmt::Debug for RecipeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // secret values are shown as a count only
        f.debug_struct("RecipeOutput")
            .field("values", &self.values)
            .field("secrets", &format_args!("<{} redacted>", self.secrets.len()))
            .field("resources", &self.resources)
            .finish()
    }
}
