//! Conflict objects, categories, and resolution records.
//!
//! A conflict is two or more concurrent operations addressing the same
//! target path. The conflict object carries the category, the involved
//! operations, and the resolution options generated at creation; the
//! resolution record captures how a conflict was settled and with what
//! confidence.

pub mod conflict;
pub mod kind;
pub mod resolution;

pub use conflict::{Conflict, ResolutionOption};
pub use kind::{ConflictSeverity, ConflictType, ResolutionComplexity};
pub use resolution::{ConfidenceLevel, ConflictResolution, ResolutionStrategy, UserSelection};
