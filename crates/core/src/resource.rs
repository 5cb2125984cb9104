// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource records
//!
//! The persisted desired + observed state of one platform-managed
//! resource. Mutated only through store-mediated writes; the version token
//! lives in the store beside the record.

use crate::recipe::{RecipeOutput, RecipeRef};
use crate::resource_id::ResourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Provisioning status of a resource record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProvisioningState {
    NotProvisioned,
    Provisioning,
    Provisioned,
    Failed,
    Deleting,
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::NotProvisioned => "notProvisioned",
            ProvisioningState::Provisioning => "provisioning",
            ProvisioningState::Provisioned => "provisioned",
            ProvisioningState::Failed => "failed",
            ProvisioningState::Deleting => "deleting",
        };
        write!(f, "{s}")
    }
}

/// The declarative payload accepted for create-or-update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Declared properties, an opaque structured document
    pub properties: Value,
    /// The recipe that materializes this resource
    pub recipe: RecipeRef,
}

impl ResourceSpec {
    pub fn new(recipe: RecipeRef, properties: Value) -> Self {
        Self { properties, recipe }
    }
}

/// Persisted representation of one resource
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub recipe: RecipeRef,
    /// Declared properties from the resource spec
    pub properties: Value,
    /// Computed values filled in post-provisioning
    #[serde(default)]
    pub computed_values: Map<String, Value>,
    /// Secret projection, excluded from the default read view
    #[serde(default)]
    pub secrets: Map<String, Value>,
    /// References to provisioned infrastructure, kept for cleanup
    #[serde(default)]
    pub output_resources: Vec<String>,
    pub provisioning_state: ProvisioningState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(id: ResourceId, spec: ResourceSpec) -> Self {
        let now = Utc::now();
        Self {
            id,
            recipe: spec.recipe,
            properties: spec.properties,
            computed_values: Map::new(),
            secrets: Map::new(),
            output_resources: Vec::new(),
            provisioning_state: ProvisioningState::NotProvisioned,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the declared spec on an existing record, keeping identity
    /// and prior outputs
    pub fn with_spec(mut self, spec: ResourceSpec) -> Self {
        self.recipe = spec.recipe;
        self.properties = spec.properties;
        self.updated_at = Utc::now();
        self
    }

    /// The record as returned by read paths: secret projection emptied
    pub fn read_view(&self) -> ResourceRecord {
        ResourceRecord {
            secrets: Map::new(),
            ..self.clone()
        }
    }

    /// Merge a successful recipe output into the record and mark it
    /// provisioned
    pub fn apply_output(&mut self, output: &RecipeOutput) {
        self.computed_values = output.values.clone();
        self.secrets = output.secrets.clone();
        self.output_resources = output.resources.clone();
        self.provisioning_state = ProvisioningState::Provisioned;
        self.updated_at = Utc::now();
    }

    /// Set the provisioning state, bumping the modification timestamp
    pub fn mark(&mut self, state: ProvisioningState) {
        self.provisioning_state = state;
        self.updated_at = Utc::now();
    }

    /// Reconstruct the last recorded output, used to build delete and
    /// re-execute requests
    pub fn recorded_output(&self) -> RecipeOutput {
        RecipeOutput {
            values: self.computed_values.clone(),
            secrets: self.secrets.clone(),
            resources: self.output_resources.clone(),
        }
    }

    /// Raw `connections.{name}.source` entries from the declared
    /// properties. The caller resolves the source values into ids.
    pub fn connection_sources(&self) -> Vec<(&str, &Value)> {
        let Some(connections) = self
            .properties
            .get("connections")
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };

        connections
            .iter()
            .map(|(name, connection)| {
                let source = connection.get("source").unwrap_or(&Value::Null);
                (name.as_str(), source)
            })
            .collect()
    }
}

impl fmt::Debug for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // secret values are shown as a count only
        f.debug_struct("ResourceRecord")
            .field("id", &self.id)
            .field("recipe", &self.recipe)
            .field("provisioning_state", &self.provisioning_state)
            .field("computed_values", &self.computed_values)
            .field("secrets", &format_args!("<{} redacted>", self.secrets.len()))
            .field("output_resources", &self.output_resources)
            .finish_non_exhaustive()
    }
}
