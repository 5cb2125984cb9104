// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical resource identity
//!
//! A resource id is a typed path: ordered scope pairs, a provider
//! namespace, and one or more type/name pairs. The canonical string form is
//!
//! ```text
//! /subscriptions/s1/resourceGroups/rg1/providers/Applications.Core/containers/frontend
//! ```
//!
//! Ids are immutable once parsed. Comparison and hashing are
//! case-insensitive across every component; `Display` preserves the casing
//! the id was built with.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Path keyword separating scope pairs from the provider namespace
const PROVIDERS: &str = "providers";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("resource id must start with '/'")]
    MissingLeadingSlash,
    #[error("resource id contains an empty or reserved segment")]
    InvalidSegment,
    #[error("resource id has no scope before the provider namespace")]
    MissingScope,
    #[error("resource id has no provider namespace")]
    MissingProvider,
    #[error("resource id has no type/name pairs")]
    MissingType,
    #[error("unpaired trailing segment: {0}")]
    UnpairedSegment(String),
}

/// One scope pair, e.g. `resourceGroups/rg1`
#[derive(Debug, Clone)]
pub struct ScopeSegment {
    pub kind: String,
    pub name: String,
}

/// One type/name pair, e.g. `containers/frontend`
#[derive(Debug, Clone)]
pub struct TypeSegment {
    pub resource_type: String,
    pub name: String,
}

/// A fully qualified resource id
#[derive(Clone)]
pub struct ResourceId {
    scopes: Vec<ScopeSegment>,
    provider: String,
    types: Vec<TypeSegment>,
}

impl ResourceId {
    /// Parse an id from its canonical string form
    pub fn parse(s: &str) -> Result<Self, ResourceIdError> {
        let rest = s
            .strip_prefix('/')
            .ok_or(ResourceIdError::MissingLeadingSlash)?;

        let segments: Vec<&str> = rest.split('/').collect();
        for segment in &segments {
            // "." and ".." are rejected so ids can double as store paths
            if segment.is_empty() || *segment == "." || *segment == ".." {
                return Err(ResourceIdError::InvalidSegment);
            }
        }

        let mut scopes = Vec::new();
        let mut i = 0;
        while i < segments.len() && !segments[i].eq_ignore_ascii_case(PROVIDERS) {
            let kind = segments[i];
            let name = match segments.get(i + 1) {
                Some(name) if !name.eq_ignore_ascii_case(PROVIDERS) => *name,
                _ => return Err(ResourceIdError::UnpairedSegment(kind.to_string())),
            };
            scopes.push(ScopeSegment {
                kind: kind.to_string(),
                name: name.to_string(),
            });
            i += 2;
        }

        if i >= segments.len() {
            return Err(ResourceIdError::MissingProvider);
        }
        if scopes.is_empty() {
            return Err(ResourceIdError::MissingScope);
        }

        // segments[i] is the "providers" keyword
        let provider = segments
            .get(i + 1)
            .ok_or(ResourceIdError::MissingProvider)?
            .to_string();
        i += 2;

        let mut types = Vec::new();
        while i < segments.len() {
            let resource_type = segments[i];
            let name = segments
                .get(i + 1)
                .ok_or_else(|| ResourceIdError::UnpairedSegment(resource_type.to_string()))?;
            types.push(TypeSegment {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
            });
            i += 2;
        }

        if types.is_empty() {
            return Err(ResourceIdError::MissingType);
        }

        Ok(Self {
            scopes,
            provider,
            types,
        })
    }

    pub fn scopes(&self) -> &[ScopeSegment] {
        &self.scopes
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn types(&self) -> &[TypeSegment] {
        &self.types
    }

    /// The qualified type of the identified resource, e.g.
    /// `Applications.Core/containers`
    pub fn resource_type(&self) -> String {
        // parse guarantees at least one type segment
        let last = &self.types[self.types.len() - 1];
        format!("{}/{}", self.provider, last.resource_type)
    }

    /// The name of the identified resource (last type pair)
    pub fn name(&self) -> &str {
        &self.types[self.types.len() - 1].name
    }

    /// The id of the enclosing resource, if any.
    ///
    /// Returns `None` for a top-level resource: every id must keep at least
    /// one type pair.
    pub fn parent(&self) -> Option<ResourceId> {
        if self.types.len() < 2 {
            return None;
        }
        let mut parent = self.clone();
        parent.types.pop();
        Some(parent)
    }

    /// Append a child type/name pair
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> ResourceId {
        let mut child = self.clone();
        child.types.push(TypeSegment {
            resource_type: resource_type.into(),
            name: name.into(),
        });
        child
    }

    /// Prefix containment: `self` contains `other` when they share scope
    /// and provider and `self`'s type pairs are a prefix of `other`'s.
    /// An id contains itself.
    pub fn contains(&self, other: &ResourceId) -> bool {
        if self.scopes.len() != other.scopes.len() || self.types.len() > other.types.len() {
            return false;
        }
        if !self.provider.eq_ignore_ascii_case(&other.provider) {
            return false;
        }
        let scopes_match = self.scopes.iter().zip(&other.scopes).all(|(a, b)| {
            a.kind.eq_ignore_ascii_case(&b.kind) && a.name.eq_ignore_ascii_case(&b.name)
        });
        let types_match = self.types.iter().zip(&other.types).all(|(a, b)| {
            a.resource_type.eq_ignore_ascii_case(&b.resource_type)
                && a.name.eq_ignore_ascii_case(&b.name)
        });
        scopes_match && types_match
    }

    /// Name of the enclosing subscription scope, if present
    pub fn subscription(&self) -> Option<&str> {
        self.scope_named("subscriptions")
    }

    /// Name of the enclosing resource group scope, if present
    pub fn resource_group(&self) -> Option<&str> {
        self.scope_named("resourceGroups")
    }

    fn scope_named(&self, kind: &str) -> Option<&str> {
        self.scopes
            .iter()
            .find(|s| s.kind.eq_ignore_ascii_case(kind))
            .map(|s| s.name.as_str())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in &self.scopes {
            write!(f, "/{}/{}", scope.kind, scope.name)?;
        }
        write!(f, "/{}/{}", PROVIDERS, self.provider)?;
        for t in &self.types {
            write!(f, "/{}/{}", t.resource_type, t.name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self)
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.contains(other) && other.types.len() == self.types.len()
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // must agree with the case-insensitive PartialEq
        for scope in &self.scopes {
            scope.kind.to_ascii_lowercase().hash(state);
            scope.name.to_ascii_lowercase().hash(state);
        }
        self.provider.to_ascii_lowercase().hash(state);
        for t in &self.types {
            t.resource_type.to_ascii_lowercase().hash(state);
            t.name.to_ascii_lowercase().hash(state);
        }
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[path = "resource_id_tests.rs"]
mod tests;
