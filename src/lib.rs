#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Proofsync-Core is a deterministic synchronization core for a
//! collaboratively edited proof document.
//!
//! This crate provides the causally ordered operation model that lets
//! independent devices edit the same document offline and converge on
//! reunion: vector clocks, typed path-addressed operations, conflict
//! detection and classification, and operational transformation. All core
//! values are immutable; producers return fresh values and never touch
//! global state.

// Module for device and operation identifiers.
pub mod identity;

// Module for logical time: vector clocks and the derived total-order stamp.
pub mod time;

// Module for operations: type taxonomy, payloads, the operation record and
// its factory.
pub mod operation;

// Module for conflict objects, categories, and resolution records.
pub mod conflict;

// Module for the detection and transformation services.
pub mod services;

// Module for consumed collaborator interfaces (repositories, orchestration).
pub mod host;

// Module for core error types.
pub mod error;

// Re-export the primary surface for consumers of this crate.
pub use conflict::{
    ConfidenceLevel, Conflict, ConflictResolution, ConflictSeverity, ConflictType,
    ResolutionComplexity, ResolutionOption, ResolutionStrategy, UserSelection,
};
pub use error::SyncError;
pub use identity::{DeviceId, OperationId};
pub use operation::{
    Operation, OperationFactory, OperationPayload, OperationRequest, OperationType, PayloadKind,
    TransformationStrategy,
};
pub use services::{
    ConflictDetectionService, OperationTransformationService, TransformationComplexity,
    TransformationPriority,
};
pub use time::{LogicalTimestamp, VectorClock};
