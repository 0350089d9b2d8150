//! Logical-time utilities for the synchronization core.
//!
//! `VectorClock` carries the causal partial order; `LogicalTimestamp` is a
//! scalar derived from a clock that provides the deterministic total
//! tiebreaker for otherwise concurrent operations.

pub mod logical;
pub mod vector;

pub use logical::LogicalTimestamp;
pub use vector::VectorClock;
