//! Identifier types for devices and operations.
//!
//! Both identifiers are validated strings: a `DeviceId` names a device
//! install for the lifetime of that install, and an `OperationId` names a
//! single operation exactly once. Neither is ever mutated or reused.

pub mod device;
pub mod op_id;

pub use device::DeviceId;
pub use op_id::OperationId;
