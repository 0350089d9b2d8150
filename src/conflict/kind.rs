use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// Closed enumeration of conflict categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// At least one side deletes what the other touches.
    DeletionConflict,
    /// Concurrent edits to content.
    SemanticConflict,
    /// Concurrent edits to graph shape.
    StructuralConflict,
    /// Concurrent modification involving content but no destructive or
    /// directly competing content edit.
    ConcurrentModification,
}

/// Severity grades attached to conflicts by the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// How involved a resolution is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionComplexity {
    Simple,
    Moderate,
    Complex,
}

pub const ALL_CONFLICT_TYPES: [ConflictType; 4] = [
    ConflictType::DeletionConflict,
    ConflictType::SemanticConflict,
    ConflictType::StructuralConflict,
    ConflictType::ConcurrentModification,
];

impl ConflictType {
    /// Parses the SCREAMING_SNAKE token form. Unknown tokens are a
    /// validation error.
    pub fn parse(token: &str) -> Result<Self, SyncError> {
        ALL_CONFLICT_TYPES
            .into_iter()
            .find(|ty| ty.as_token() == token)
            .ok_or_else(|| SyncError::Validation(format!("unknown conflict type: {token}")))
    }

    pub fn as_token(self) -> &'static str {
        match self {
            ConflictType::DeletionConflict => "DELETION_CONFLICT",
            ConflictType::SemanticConflict => "SEMANTIC_CONFLICT",
            ConflictType::StructuralConflict => "STRUCTURAL_CONFLICT",
            ConflictType::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }

    /// Both content-touching categories count as semantic.
    pub fn is_semantic(self) -> bool {
        matches!(
            self,
            ConflictType::SemanticConflict | ConflictType::ConcurrentModification
        )
    }

    pub fn is_structural(self) -> bool {
        self == ConflictType::StructuralConflict
    }

    /// Destructive conflicts lose data on one side whatever the outcome.
    pub fn is_destructive(self) -> bool {
        self == ConflictType::DeletionConflict
    }

    /// Whether merging both sides is ever on the table. Destructive
    /// conflicts never merge.
    pub fn supports_merge(self) -> bool {
        self == ConflictType::StructuralConflict
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}
