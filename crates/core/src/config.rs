// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration. Durations use humantime syntax ("30s", "5m").

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for the operation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on operations deploying at the same time
    pub max_concurrent_operations: usize,
    /// Attempt ceiling for retryable failures
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt
    #[serde(with = "humantime_serde")]
    pub retry_base: Duration,
    /// Ceiling on the backoff delay
    #[serde(with = "humantime_serde")]
    pub retry_cap: Duration,
    /// Deadline for a single driver execute/delete call
    #[serde(with = "humantime_serde")]
    pub driver_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 8,
            max_attempts: 3,
            retry_base: Duration::from_secs(1),
            retry_cap: Duration::from_secs(30),
            driver_timeout: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    pub fn with_max_concurrent_operations(mut self, limit: usize) -> Self {
        self.max_concurrent_operations = limit;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    pub fn with_retry_cap(mut self, cap: Duration) -> Self {
        self.retry_cap = cap;
        self
    }

    pub fn with_driver_timeout(mut self, timeout: Duration) -> Self {
        self.driver_timeout = timeout;
        self
    }

    /// Parse a TOML document
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}
