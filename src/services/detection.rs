use crate::conflict::{Conflict, ConflictSeverity, ConflictType, ResolutionComplexity};
use crate::error::SyncError;
use crate::operation::{Operation, OperationVerb};

/// Pairwise and sequence-wide conflict discovery.
///
/// Stateless; every assessment is a pure function of the operations and
/// conflict objects handed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictDetectionService;

impl ConflictDetectionService {
    pub fn new() -> Self {
        ConflictDetectionService
    }

    /// Detects a conflict between two operations, fabricating the
    /// conflict id from both operation ids.
    pub fn detect_between(
        &self,
        a: &Operation,
        b: &Operation,
    ) -> Result<Option<Conflict>, SyncError> {
        let Some(conflict_type) = a.detect_conflict_with(b) else {
            return Ok(None);
        };
        tracing::debug!(
            left = %a.id(),
            right = %b.id(),
            conflict_type = %conflict_type,
            path = a.target_path(),
            "conflict detected"
        );
        let id = format!("conflict-{}-{}", a.id(), b.id());
        Conflict::new(id, conflict_type, a.target_path(), vec![a.clone(), b.clone()]).map(Some)
    }

    /// Detects conflicts across every ordered pair of a batch.
    pub fn detect_in_sequence(&self, ops: &[Operation]) -> Result<Vec<Conflict>, SyncError> {
        let mut conflicts = Vec::new();
        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                if let Some(conflict) = self.detect_between(a, b)? {
                    conflicts.push(conflict);
                }
            }
        }
        Ok(conflicts)
    }

    /// Partitions a batch into groups of mutually concurrent operations.
    pub fn find_concurrent_groups(&self, ops: &[Operation]) -> Vec<Vec<Operation>> {
        Operation::find_concurrent_groups(ops)
    }

    /// Whether two operations are even eligible to conflict: same path,
    /// concurrent, and a contentious verb pairing.
    pub fn can_operations_conflict(&self, a: &Operation, b: &Operation) -> bool {
        if a.target_path() != b.target_path() || !a.is_concurrent_with(b) {
            return false;
        }
        use OperationVerb::*;
        matches!(
            (a.operation_type().verb(), b.operation_type().verb()),
            (Delete, _) | (_, Delete) | (Update, Update) | (Create, Create) | (Update, Create) | (Create, Update)
        )
    }

    /// Classifies a conflicting pair. Deletions dominate; a pair whose
    /// payloads both carry textual content is a semantic conflict; purely
    /// structural pairs are structural; everything else involving content
    /// is a concurrent modification.
    pub fn determine_conflict_type(&self, a: &Operation, b: &Operation) -> ConflictType {
        let (ta, tb) = (a.operation_type(), b.operation_type());
        if ta.is_deletion() || tb.is_deletion() {
            ConflictType::DeletionConflict
        } else if Self::carries_content(a) && Self::carries_content(b) {
            ConflictType::SemanticConflict
        } else if ta.is_structural() && tb.is_structural() {
            ConflictType::StructuralConflict
        } else {
            ConflictType::ConcurrentModification
        }
    }

    /// Grades a conflict for triage.
    pub fn analyze_severity(&self, conflict: &Conflict) -> ConflictSeverity {
        match conflict.conflict_type() {
            ConflictType::DeletionConflict => ConflictSeverity::High,
            ConflictType::SemanticConflict => ConflictSeverity::Critical,
            ConflictType::StructuralConflict => {
                if conflict.operations().len() > 2 {
                    ConflictSeverity::High
                } else {
                    ConflictSeverity::Medium
                }
            }
            ConflictType::ConcurrentModification => ConflictSeverity::Medium,
        }
    }

    /// Estimates how involved resolving a conflict will be.
    pub fn estimate_complexity(&self, conflict: &Conflict) -> ResolutionComplexity {
        let severity = self.analyze_severity(conflict);
        if conflict.conflict_type() == ConflictType::SemanticConflict
            || severity >= ConflictSeverity::High
        {
            ResolutionComplexity::Complex
        } else if conflict.conflict_type().is_structural() {
            ResolutionComplexity::Moderate
        } else {
            ResolutionComplexity::Simple
        }
    }

    /// Whether the service would resolve this conflict without a user.
    /// Semantic conflicts never auto-resolve; simple ones always do, and
    /// concurrent modifications are trusted up to moderate complexity.
    pub fn can_auto_resolve(&self, conflict: &Conflict) -> bool {
        if conflict.conflict_type() == ConflictType::SemanticConflict {
            return false;
        }
        match self.estimate_complexity(conflict) {
            ResolutionComplexity::Simple => true,
            ResolutionComplexity::Moderate => {
                conflict.conflict_type() == ConflictType::ConcurrentModification
            }
            ResolutionComplexity::Complex => false,
        }
    }

    fn carries_content(op: &Operation) -> bool {
        op.payload().has_field("content") || op.payload().has_field("text")
    }
}
