//! canopy-core: Core library for the Canopy control plane
//!
//! This crate provides:
//! - Typed resource identity (hierarchical scope + type/name paths)
//! - Resource and operation records with pure state transitions
//! - Recipe value types shared between the engine and drivers
//! - The error taxonomy and the adapter-facing error payload shape
//! - Engine configuration

pub mod id;

pub mod config;
pub mod error;
pub mod operation;
pub mod recipe;
pub mod resource;
pub mod resource_id;
pub mod response;

// Re-exports
pub use config::{ConfigError, EngineConfig};
pub use error::{Classify, ErrorKind};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use operation::{OperationEvent, OperationId, OperationKind, OperationRecord, OperationStatus};
pub use recipe::{RecipeOutput, RecipeRef};
pub use resource::{ProvisioningState, ResourceRecord, ResourceSpec};
pub use resource_id::{ResourceId, ResourceIdError};
pub use response::{ErrorDetail, ErrorResponse};
