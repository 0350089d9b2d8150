use crate::error::SyncError;
use crate::operation::{Operation, OperationType, TransformationStrategy};
use serde::{Deserialize, Serialize};

// Sequence sizes at or below this are trivially transformable.
const SIMPLE_SEQUENCE_LEN: usize = 2;
// Sequence sizes above this are not worth attempting automatically.
const INTRACTABLE_SEQUENCE_LEN: usize = 20;
// Bounds above which a moderate sequence is graded complex.
const COMPLEX_SEMANTIC_COUNT: usize = 5;
const COMPLEX_GROUP_COUNT: usize = 3;

/// Expected effort of transforming a whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationComplexity {
    Simple,
    Moderate,
    Complex,
    Intractable,
}

/// Scheduling priority for a transformation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationPriority {
    Medium,
    High,
}

/// Strategy dispatch and sequence transformation.
///
/// The service is the batch-level face of the pairwise transformation
/// hosted on `Operation`; it adds ordering, complexity grading, and
/// priority assessment.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationTransformationService;

impl OperationTransformationService {
    pub fn new() -> Self {
        OperationTransformationService
    }

    /// The strategy that would rewrite an operation of type `a` against
    /// one of type `b`.
    pub fn select_strategy(
        &self,
        a: OperationType,
        b: OperationType,
    ) -> TransformationStrategy {
        TransformationStrategy::select(a, b)
    }

    /// Rewrites `op` against a single concurrent peer.
    pub fn transform(
        &self,
        op: &Operation,
        against: &Operation,
    ) -> Result<Operation, SyncError> {
        op.transform_with(against)
    }

    /// Rewrites both sides of a concurrent pair.
    pub fn transform_pair(
        &self,
        a: &Operation,
        b: &Operation,
    ) -> Result<(Operation, Operation), SyncError> {
        Ok((a.transform_with(b)?, b.transform_with(a)?))
    }

    /// Orders a batch causally (ties by logical timestamp) and transforms
    /// each operation against the concurrent operations placed before it.
    pub fn transform_sequence(&self, ops: &[Operation]) -> Result<Vec<Operation>, SyncError> {
        tracing::debug!(
            count = ops.len(),
            complexity = ?self.estimate_complexity(ops),
            "transforming operation sequence"
        );
        Operation::transform_operation_sequence(ops)
    }

    /// Heuristic cost grade for a sequence: tiny batches are simple, very
    /// large ones intractable, and mid-sized batches grade up on heavy
    /// semantic content or many concurrent groups.
    pub fn estimate_complexity(&self, ops: &[Operation]) -> TransformationComplexity {
        if ops.len() <= SIMPLE_SEQUENCE_LEN {
            return TransformationComplexity::Simple;
        }
        if ops.len() > INTRACTABLE_SEQUENCE_LEN {
            return TransformationComplexity::Intractable;
        }
        let semantic = ops
            .iter()
            .filter(|op| op.operation_type().is_semantic())
            .count();
        let groups = Operation::find_concurrent_groups(ops).len();
        if semantic > COMPLEX_SEMANTIC_COUNT || groups > COMPLEX_GROUP_COUNT {
            TransformationComplexity::Complex
        } else {
            TransformationComplexity::Moderate
        }
    }

    /// Batches touching content or deleting anything are urgent.
    pub fn priority(&self, ops: &[Operation]) -> TransformationPriority {
        let urgent = ops.iter().any(|op| {
            op.operation_type().is_semantic() || op.operation_type().is_deletion()
        });
        if urgent {
            TransformationPriority::High
        } else {
            TransformationPriority::Medium
        }
    }
}
