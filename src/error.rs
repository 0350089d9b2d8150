//!
//! Defines error types for the synchronization core.

/// Represents errors that can occur while constructing, transforming, or
/// resolving synchronization values.
///
/// Every fallible operation in the crate returns one of these; the core
/// never panics. Collaborator failures are captured and surfaced through
/// the same enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Input rejected at a construction boundary: invalid id, blank path,
    /// malformed payload, oversized payload, or an unknown enum token.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A pre-condition failed while applying an operation to state, such
    /// as deleting a missing entry or creating an existing one.
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// A lifecycle rule was broken: double resolution, resolving with an
    /// unsupported strategy, or transforming incompatible operations.
    #[error("invalid state: {0}")]
    State(String),
    /// Malformed JSON input or a failed serialization round-trip.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// Reported by the orchestration collaborator when a cross-context
    /// request exceeds its budget.
    #[error("{context} timed out after {timeout_ms}ms")]
    Timeout { context: String, timeout_ms: u64 },
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
