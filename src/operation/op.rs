use crate::conflict::ConflictType;
use crate::error::SyncError;
use crate::identity::{DeviceId, OperationId};
use crate::operation::kind::{OperationType, OperationVerb};
use crate::operation::payload::{OperationPayload, PayloadKind};
use crate::time::{LogicalTimestamp, VectorClock};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Strategy chosen when rewriting one of two concurrent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationStrategy {
    PositionAdjustment,
    ContentMerge,
    StructuralReorder,
    OperationalTransform,
    LastWriterWins,
}

impl TransformationStrategy {
    /// Picks the strategy for a pair of operation types. Position updates
    /// win first, then category pairings, then the commutativity table.
    pub fn select(a: OperationType, b: OperationType) -> TransformationStrategy {
        if a == OperationType::UpdateTreePosition || b == OperationType::UpdateTreePosition {
            TransformationStrategy::PositionAdjustment
        } else if a.is_semantic() && b.is_semantic() {
            TransformationStrategy::ContentMerge
        } else if a.is_structural() && b.is_structural() {
            TransformationStrategy::StructuralReorder
        } else if a.can_commute_with(b) {
            TransformationStrategy::OperationalTransform
        } else {
            TransformationStrategy::LastWriterWins
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            TransformationStrategy::PositionAdjustment => "POSITION_ADJUSTMENT",
            TransformationStrategy::ContentMerge => "CONTENT_MERGE",
            TransformationStrategy::StructuralReorder => "STRUCTURAL_REORDER",
            TransformationStrategy::OperationalTransform => "OPERATIONAL_TRANSFORM",
            TransformationStrategy::LastWriterWins => "LAST_WRITER_WINS",
        }
    }
}

impl std::fmt::Display for TransformationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Immutable record of a single mutation: identity, addressing, payload,
/// and causal tag.
///
/// Equality and hashing consider only the id. The logical timestamp is
/// derived from the vector clock at construction and re-derived on
/// deserialization, so it can never drift from the clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "OperationWire")]
pub struct Operation {
    id: OperationId,
    device_id: DeviceId,
    operation_type: OperationType,
    target_path: String,
    payload: OperationPayload,
    vector_clock: VectorClock,
    timestamp: LogicalTimestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_operation_id: Option<OperationId>,
}

// Wire shape for deserialization; every required field must be present and
// the construction invariants are re-checked before an Operation exists.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationWire {
    id: OperationId,
    device_id: DeviceId,
    operation_type: OperationType,
    target_path: String,
    payload: OperationPayload,
    vector_clock: VectorClock,
    #[allow(dead_code)]
    timestamp: LogicalTimestamp,
    #[serde(default)]
    parent_operation_id: Option<OperationId>,
}

impl TryFrom<OperationWire> for Operation {
    type Error = SyncError;

    fn try_from(wire: OperationWire) -> Result<Self, Self::Error> {
        Operation::new(
            wire.id,
            wire.device_id,
            wire.operation_type,
            wire.target_path,
            wire.payload,
            wire.vector_clock,
            wire.parent_operation_id,
        )
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Operation {}

impl std::hash::Hash for Operation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Operation {
    /// Validates and constructs an operation. The target path must be
    /// non-blank, the payload kind must match the operation type (generic
    /// payloads are accepted for transformation successors), and the
    /// vector clock must carry an entry for the authoring device.
    pub fn new(
        id: OperationId,
        device_id: DeviceId,
        operation_type: OperationType,
        target_path: String,
        payload: OperationPayload,
        vector_clock: VectorClock,
        parent_operation_id: Option<OperationId>,
    ) -> Result<Self, SyncError> {
        if target_path.trim().is_empty() {
            return Err(SyncError::Validation(
                "operation target path must not be blank".into(),
            ));
        }
        let expected = operation_type.payload_kind();
        if payload.kind() != expected && payload.kind() != PayloadKind::Generic {
            return Err(SyncError::Validation(format!(
                "operation type {operation_type} requires a {expected:?} payload, got {:?}",
                payload.kind()
            )));
        }
        if !vector_clock.contains_key(device_id.as_str()) {
            return Err(SyncError::Validation(format!(
                "vector clock is missing an entry for device {device_id}"
            )));
        }
        let timestamp = LogicalTimestamp::from_clock(&vector_clock);
        Ok(Operation {
            id,
            device_id,
            operation_type,
            target_path,
            payload,
            vector_clock,
            timestamp,
            parent_operation_id,
        })
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn vector_clock(&self) -> &VectorClock {
        &self.vector_clock
    }

    pub fn timestamp(&self) -> &LogicalTimestamp {
        &self.timestamp
    }

    pub fn parent_operation_id(&self) -> Option<&OperationId> {
        self.parent_operation_id.as_ref()
    }

    /// JSON rendering of the operation.
    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates an operation from JSON. Missing required
    /// fields and invariant violations are rejected.
    pub fn from_json(input: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(input)?)
    }

    // ── Causality ────────────────────────────────────────────────────────

    /// True iff this operation causally depends on `other`.
    pub fn has_causal_dependency_on(&self, other: &Operation) -> bool {
        self.vector_clock.happens_after(&other.vector_clock)
    }

    pub fn is_concurrent_with(&self, other: &Operation) -> bool {
        self.vector_clock.is_concurrent_with(&other.vector_clock)
    }

    /// Operations on different paths always commute; on the same path only
    /// structural pairs whose types commute do.
    pub fn can_commute_with(&self, other: &Operation) -> bool {
        if self.target_path != other.target_path {
            return true;
        }
        self.operation_type.is_structural()
            && other.operation_type.is_structural()
            && self.operation_type.can_commute_with(other.operation_type)
    }

    /// Transformation requires concurrency (neither side causally depends
    /// on the other), a shared target path, and compatible types: a
    /// creation never transforms against a deletion, and two semantic
    /// statement operations never transform against each other.
    pub fn can_transform_with(&self, other: &Operation) -> bool {
        if self.has_causal_dependency_on(other) || other.has_causal_dependency_on(self) {
            return false;
        }
        if self.target_path != other.target_path {
            return false;
        }
        let (a, b) = (self.operation_type, other.operation_type);
        let creation_vs_deletion =
            (a.is_creation() && b.is_deletion()) || (a.is_deletion() && b.is_creation());
        let both_statement_semantic = a.target() == crate::operation::OperationTarget::Statement
            && b.target() == crate::operation::OperationTarget::Statement
            && a.is_semantic()
            && b.is_semantic();
        !(creation_vs_deletion || both_statement_semantic)
    }

    // ── State application ────────────────────────────────────────────────

    /// Applies this operation to a path-keyed state, returning the new
    /// state. Creations require the path to be absent; updates and
    /// deletions require it to exist.
    pub fn apply_to(
        &self,
        state: &BTreeMap<String, OperationPayload>,
    ) -> Result<BTreeMap<String, OperationPayload>, SyncError> {
        let mut next = state.clone();
        match self.operation_type.verb() {
            OperationVerb::Create => {
                if next.contains_key(&self.target_path) {
                    return Err(SyncError::Invariant(format!(
                        "cannot create {}: path already exists",
                        self.target_path
                    )));
                }
                next.insert(self.target_path.clone(), self.payload.clone());
            }
            OperationVerb::Update => {
                if !next.contains_key(&self.target_path) {
                    return Err(SyncError::Invariant(format!(
                        "cannot update {}: path does not exist",
                        self.target_path
                    )));
                }
                next.insert(self.target_path.clone(), self.payload.clone());
            }
            OperationVerb::Delete => {
                if next.remove(&self.target_path).is_none() {
                    return Err(SyncError::Invariant(format!(
                        "cannot delete {}: path does not exist",
                        self.target_path
                    )));
                }
            }
        }
        Ok(next)
    }

    // ── Transformation ───────────────────────────────────────────────────

    /// Rewrites this operation against a concurrent peer so that either
    /// application order converges. The strategy is chosen from the two
    /// operation types; incompatible pairs are a state error.
    pub fn transform_with(&self, other: &Operation) -> Result<Operation, SyncError> {
        if !self.can_transform_with(other) {
            return Err(SyncError::State(format!(
                "operations {} and {} cannot be transformed against each other",
                self.id, other.id
            )));
        }
        let strategy = TransformationStrategy::select(self.operation_type, other.operation_type);
        tracing::debug!(
            op = %self.id,
            against = %other.id,
            strategy = %strategy,
            "transforming operation"
        );
        match strategy {
            TransformationStrategy::OperationalTransform => {
                if self.has_causal_dependency_on(other) {
                    return Ok(self.clone());
                }
                // The generic rewrite leaves the body untouched; only the
                // trace fields mark the transformation.
                self.successor(other, strategy, self.payload.kind(), self.payload.data().clone())
            }
            TransformationStrategy::PositionAdjustment => {
                if self.operation_type == OperationType::UpdateTreePosition
                    && self.payload.is_positional()
                    && other.payload.is_positional()
                {
                    let moved = self.payload.position_offset(&other.payload);
                    self.successor(other, strategy, moved.kind(), moved.data().clone())
                } else {
                    Ok(self.clone())
                }
            }
            TransformationStrategy::ContentMerge => {
                let merged = self.payload.content_merge(&other.payload);
                let mut data = merged.data().clone();
                if let Some(map) = data.as_object_mut() {
                    map.insert("mergedAt".into(), Value::String(Utc::now().to_rfc3339()));
                    map.insert(
                        "mergeType".into(),
                        Value::String("AUTOMATIC_CONTENT_MERGE".into()),
                    );
                }
                self.successor(other, strategy, merged.kind(), data)
            }
            TransformationStrategy::StructuralReorder => {
                if other.operation_type.is_creation()
                    && self.target_path.starts_with(&other.target_path)
                {
                    let mut map = into_object(self.payload.data().clone());
                    map.insert("adjustedFor".into(), Value::String(other.id.to_string()));
                    map.insert("adjustedAt".into(), Value::String(Utc::now().to_rfc3339()));
                    self.successor(other, strategy, self.payload.kind(), Value::Object(map))
                } else {
                    Ok(self.clone())
                }
            }
            TransformationStrategy::LastWriterWins => {
                if self.vector_clock.happens_after(&other.vector_clock) {
                    return Ok(self.clone());
                }
                let mut map = Map::new();
                map.insert("noOp".into(), Value::Bool(true));
                map.insert("originalPayload".into(), self.payload.data().clone());
                self.successor(other, strategy, PayloadKind::Generic, Value::Object(map))
            }
        }
    }

    /// Folds this operation over every transformable concurrent peer,
    /// replacing it with each successive transformed successor.
    pub fn transform_against(&self, peers: &[Operation]) -> Result<Operation, SyncError> {
        let mut current = self.clone();
        for peer in peers {
            if current.is_concurrent_with(peer) && current.can_transform_with(peer) {
                current = current.transform_with(peer)?;
            }
        }
        Ok(current)
    }

    /// Orders a batch causally and transforms each operation against the
    /// concurrent operations already placed before it.
    ///
    /// The logical timestamp is a topological key for the causal order
    /// (the clock entry-sum strictly increases along every causal edge),
    /// so a single sort yields dependency order with deterministic ties.
    pub fn transform_operation_sequence(ops: &[Operation]) -> Result<Vec<Operation>, SyncError> {
        let mut ordered: Vec<Operation> = ops.to_vec();
        ordered.sort_by_key(|op| op.timestamp.clone());

        let mut placed: Vec<Operation> = Vec::with_capacity(ordered.len());
        for op in ordered {
            // An operation that already carries the transformation trace
            // was rewritten in an earlier pass; rewriting it again would
            // compound the adjustment, so re-runs leave it in place.
            let already_transformed = op.payload().has_field("transformationApplied");
            let mut current = op;
            if !already_transformed {
                for prior in &placed {
                    if current.is_concurrent_with(prior) && current.can_transform_with(prior) {
                        current = current.transform_with(prior)?;
                    }
                }
            }
            placed.push(current);
        }
        Ok(placed)
    }

    /// Partitions a batch into groups of mutually observed concurrency:
    /// each unprocessed operation seeds a group of every operation
    /// concurrent with it, and groups of at least two survive.
    pub fn find_concurrent_groups(ops: &[Operation]) -> Vec<Vec<Operation>> {
        let mut processed = vec![false; ops.len()];
        let mut groups = Vec::new();
        for (i, seed) in ops.iter().enumerate() {
            if processed[i] {
                continue;
            }
            let mut members = vec![i];
            for (j, candidate) in ops.iter().enumerate() {
                if j != i && !processed[j] && seed.is_concurrent_with(candidate) {
                    members.push(j);
                }
            }
            if members.len() >= 2 {
                for &m in &members {
                    processed[m] = true;
                }
                groups.push(members.iter().map(|&m| ops[m].clone()).collect());
            } else {
                processed[i] = true;
            }
        }
        groups
    }

    // ── Conflict detection ───────────────────────────────────────────────

    /// Classifies the conflict between this operation and a peer, if any.
    /// Only concurrent operations on the same path conflict; deletions
    /// dominate the classification, then semantic content, then structure.
    pub fn detect_conflict_with(&self, other: &Operation) -> Option<ConflictType> {
        if self.target_path != other.target_path {
            return None;
        }
        if !self.is_concurrent_with(other) {
            return None;
        }
        let (a, b) = (self.operation_type, other.operation_type);
        let conflict = if a.is_deletion() || b.is_deletion() {
            ConflictType::DeletionConflict
        } else if a.is_semantic() || b.is_semantic() {
            ConflictType::SemanticConflict
        } else if a.is_structural() || b.is_structural() {
            ConflictType::StructuralConflict
        } else {
            ConflictType::ConcurrentModification
        };
        Some(conflict)
    }

    // Builds the transformed successor: fresh id on the same device,
    // identical clock and type, and the transformation trace fields.
    fn successor(
        &self,
        other: &Operation,
        strategy: TransformationStrategy,
        kind: PayloadKind,
        data: Value,
    ) -> Result<Operation, SyncError> {
        let mut map = into_object(data);
        map.insert("transformationApplied".into(), Value::Bool(true));
        map.insert(
            "transformationNote".into(),
            Value::String(format!("{strategy} against {}", other.id)),
        );
        map.insert(
            "originalOperationId".into(),
            Value::String(self.id.to_string()),
        );
        let id = match self.id.sequence() {
            Some(seq) => OperationId::generate(&self.device_id, seq.saturating_add(1)),
            None => OperationId::generate_with_uuid(&self.device_id),
        };
        Operation::new(
            id,
            self.device_id.clone(),
            self.operation_type,
            self.target_path.clone(),
            OperationPayload::from_parts(kind, Value::Object(map)),
            self.vector_clock.clone(),
            self.parent_operation_id.clone(),
        )
    }
}

// Reshapes a payload body into an object so trace fields can be attached.
// Null bodies become empty objects; scalar bodies are wrapped under
// `value`.
fn into_object(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dev(raw: &str) -> DeviceId {
        DeviceId::new(raw).unwrap()
    }

    fn op(
        device: &str,
        seq: u64,
        ty: OperationType,
        path: &str,
        data: Value,
        clock: &[(&str, u64)],
    ) -> Operation {
        let device = dev(device);
        let clock = VectorClock::from_map(
            clock.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        );
        let payload = if ty.payload_kind() == PayloadKind::Empty {
            OperationPayload::empty()
        } else {
            OperationPayload::new(data, ty).unwrap()
        };
        Operation::new(
            OperationId::generate(&device, seq),
            device,
            ty,
            path.to_string(),
            payload,
            clock,
            None,
        )
        .unwrap()
    }

    fn statement_update(device: &str, seq: u64, path: &str, clock: &[(&str, u64)]) -> Operation {
        op(
            device,
            seq,
            OperationType::UpdateStatement,
            path,
            json!({"id": "s1", "content": "text"}),
            clock,
        )
    }

    #[test]
    fn construction_validates_path_payload_and_clock() {
        let device = dev("device-a");
        let clock = VectorClock::empty().increment_for(&device);
        let payload =
            OperationPayload::new(json!({"id": "s1", "content": "x"}), OperationType::CreateStatement)
                .unwrap();

        assert!(Operation::new(
            OperationId::generate(&device, 0),
            device.clone(),
            OperationType::CreateStatement,
            "   ".into(),
            payload.clone(),
            clock.clone(),
            None,
        )
        .is_err());

        // Payload kind must match the type.
        assert!(Operation::new(
            OperationId::generate(&device, 0),
            device.clone(),
            OperationType::UpdateTreePosition,
            "/doc/tree".into(),
            payload.clone(),
            clock.clone(),
            None,
        )
        .is_err());

        // The clock must know the authoring device.
        assert!(Operation::new(
            OperationId::generate(&device, 0),
            device.clone(),
            OperationType::CreateStatement,
            "/doc/s1".into(),
            payload,
            VectorClock::empty(),
            None,
        )
        .is_err());
    }

    #[test]
    fn equality_depends_only_on_id() {
        let a = statement_update("device-a", 0, "/doc/title", &[("device-a", 1)]);
        let mut b = statement_update("device-a", 1, "/doc/title", &[("device-a", 2)]);
        assert_ne!(a, b);
        b.id = a.id.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn causal_predicates_follow_the_clock() {
        let earlier = statement_update("device-a", 0, "/doc/title", &[("device-a", 1)]);
        let later = statement_update("device-a", 1, "/doc/title", &[("device-a", 2)]);
        let remote = statement_update("device-b", 0, "/doc/title", &[("device-b", 1)]);

        assert!(later.has_causal_dependency_on(&earlier));
        assert!(!earlier.has_causal_dependency_on(&later));
        assert!(earlier.is_concurrent_with(&remote));
    }

    #[test]
    fn commutes_across_paths_and_for_commuting_structural_types() {
        let a = statement_update("device-a", 0, "/doc/title", &[("device-a", 1)]);
        let b = statement_update("device-b", 0, "/doc/body", &[("device-b", 1)]);
        assert!(a.can_commute_with(&b));

        let arg = op(
            "device-a",
            0,
            OperationType::CreateArgument,
            "/doc/arg",
            json!({"id": "a1", "premises": [], "conclusions": []}),
            &[("device-a", 1)],
        );
        let tree = op(
            "device-b",
            0,
            OperationType::CreateTree,
            "/doc/arg",
            json!({"id": "t1", "rootNodeId": "n1", "position": {"x": 0, "y": 0}}),
            &[("device-b", 1)],
        );
        assert!(arg.can_commute_with(&tree));

        // Same path, both semantic: never commutes.
        let other = statement_update("device-b", 0, "/doc/title", &[("device-b", 1)]);
        assert!(!a.can_commute_with(&other));
    }

    #[test]
    fn transformability_excludes_creation_deletion_and_statement_pairs() {
        let update = statement_update("device-a", 0, "/doc/s", &[("device-a", 1)]);
        let delete = op(
            "device-b",
            0,
            OperationType::DeleteStatement,
            "/doc/s",
            Value::Null,
            &[("device-b", 1)],
        );
        let create = op(
            "device-c",
            0,
            OperationType::CreateStatement,
            "/doc/s",
            json!({"id": "s1", "content": "x"}),
            &[("device-c", 1)],
        );

        // Creation vs deletion never transforms.
        assert!(!create.can_transform_with(&delete));
        assert!(!delete.can_transform_with(&create));

        // Statement operations are all semantic, so any statement pair on
        // one path is untransformable; this includes delete vs update.
        let other_update = statement_update("device-b", 0, "/doc/s", &[("device-b", 1)]);
        assert!(!update.can_transform_with(&other_update));
        assert!(!delete.can_transform_with(&update));

        // A structural deletion against a semantic update does transform.
        let arg_delete = op(
            "device-b",
            0,
            OperationType::DeleteArgument,
            "/doc/s",
            Value::Null,
            &[("device-b", 1)],
        );
        assert!(arg_delete.can_transform_with(&update));

        // Causally ordered operations never transform.
        let later = statement_update("device-a", 1, "/doc/s", &[("device-a", 2)]);
        assert!(!later.can_transform_with(&update));
    }

    #[test]
    fn apply_to_enforces_existence_preconditions() {
        let create = op(
            "device-a",
            0,
            OperationType::CreateStatement,
            "/doc/s1",
            json!({"id": "s1", "content": "x"}),
            &[("device-a", 1)],
        );
        let update = statement_update("device-a", 1, "/doc/s1", &[("device-a", 2)]);
        let delete = op(
            "device-a",
            2,
            OperationType::DeleteStatement,
            "/doc/s1",
            Value::Null,
            &[("device-a", 3)],
        );

        let empty = BTreeMap::new();
        assert!(update.apply_to(&empty).is_err());
        assert!(delete.apply_to(&empty).is_err());

        let created = create.apply_to(&empty).unwrap();
        assert!(created.contains_key("/doc/s1"));
        // The input state is untouched.
        assert!(empty.is_empty());
        assert!(create.apply_to(&created).is_err());

        let updated = update.apply_to(&created).unwrap();
        assert_eq!(updated["/doc/s1"], *update.payload());

        let deleted = delete.apply_to(&updated).unwrap();
        assert!(deleted.is_empty());
    }

    #[test]
    fn strategy_selection_follows_the_dispatch_order() {
        use OperationType::*;
        assert_eq!(
            TransformationStrategy::select(UpdateTreePosition, UpdateStatement),
            TransformationStrategy::PositionAdjustment
        );
        assert_eq!(
            TransformationStrategy::select(UpdateStatement, UpdateMetadata),
            TransformationStrategy::ContentMerge
        );
        assert_eq!(
            TransformationStrategy::select(CreateArgument, CreateTree),
            TransformationStrategy::StructuralReorder
        );
        assert_eq!(
            TransformationStrategy::select(CreateArgument, UpdateStatement),
            TransformationStrategy::OperationalTransform
        );
        assert_eq!(
            TransformationStrategy::select(DeleteTree, UpdateStatement),
            TransformationStrategy::LastWriterWins
        );
    }

    #[test]
    fn position_transform_applies_the_offset_rule() {
        let a = op(
            "device-a",
            0,
            OperationType::UpdateTreePosition,
            "/doc/tree",
            json!({"x": 100.0, "y": 200.0}),
            &[("device-a", 1)],
        );
        let b = op(
            "device-b",
            0,
            OperationType::UpdateTreePosition,
            "/doc/tree",
            json!({"x": 50.0, "y": 30.0}),
            &[("device-b", 1)],
        );
        let moved = a.transform_with(&b).unwrap();
        assert_eq!(moved.payload().get_field("x").unwrap().as_f64(), Some(105.0));
        assert_eq!(moved.payload().get_field("y").unwrap().as_f64(), Some(203.0));
        assert_eq!(
            moved.payload().get_field("transformationApplied"),
            Some(&json!(true))
        );
        assert_eq!(
            moved.payload().get_field("originalOperationId"),
            Some(&json!(a.id().as_str()))
        );
        // Successor keeps the clock and type but takes a fresh id.
        assert_eq!(moved.vector_clock(), a.vector_clock());
        assert_eq!(moved.operation_type(), a.operation_type());
        assert_ne!(moved.id(), a.id());
    }

    #[test]
    fn content_merge_transform_records_trace_fields() {
        let a = op(
            "device-a",
            0,
            OperationType::UpdateMetadata,
            "/doc/meta",
            json!({"key": "author", "value": "Alice"}),
            &[("device-a", 1)],
        );
        let b = op(
            "device-b",
            0,
            OperationType::UpdateArgument,
            "/doc/meta",
            json!({"id": "a1", "premises": [], "conclusions": []}),
            &[("device-b", 1)],
        );
        let merged = a.transform_with(&b).unwrap();
        assert_eq!(
            merged.payload().get_field("mergeType"),
            Some(&json!("AUTOMATIC_CONTENT_MERGE"))
        );
        assert!(merged.payload().has_field("mergedAt"));
        // Right bias: the peer's fields override.
        assert_eq!(merged.payload().get_field("id"), Some(&json!("a1")));
    }

    #[test]
    fn last_writer_wins_keeps_the_dominant_side() {
        let winner = op(
            "device-a",
            1,
            OperationType::DeleteTree,
            "/doc/tree",
            Value::Null,
            &[("device-a", 2), ("device-b", 1)],
        );
        let loser = statement_update("device-b", 0, "/doc/tree", &[("device-b", 1), ("device-a", 1)]);

        // Not concurrent: winner dominates, so transformation is refused.
        assert!(!winner.can_transform_with(&loser));

        // A genuinely concurrent losing side becomes a no-op.
        let concurrent_loser =
            statement_update("device-b", 0, "/doc/tree", &[("device-b", 1)]);
        let concurrent_winner = op(
            "device-a",
            1,
            OperationType::DeleteTree,
            "/doc/tree",
            Value::Null,
            &[("device-a", 2)],
        );
        let transformed = concurrent_loser.transform_with(&concurrent_winner).unwrap();
        assert_eq!(transformed.payload().get_field("noOp"), Some(&json!(true)));
        assert!(transformed.payload().has_field("originalPayload"));
    }

    #[test]
    fn structural_reorder_annotates_for_prefix_creations() {
        let child = op(
            "device-a",
            0,
            OperationType::CreateConnection,
            "/doc/arg",
            json!({"sourceId": "a", "targetId": "b", "connectionType": "support"}),
            &[("device-a", 1)],
        );
        let creation = op(
            "device-b",
            0,
            OperationType::CreateArgument,
            "/doc/arg",
            json!({"id": "a1", "premises": [], "conclusions": []}),
            &[("device-b", 1)],
        );
        let adjusted = child.transform_with(&creation).unwrap();
        assert_eq!(
            adjusted.payload().get_field("adjustedFor"),
            Some(&json!(creation.id().as_str()))
        );
        assert!(adjusted.payload().has_field("adjustedAt"));
    }

    #[test]
    fn conflict_classification_orders_deletion_semantic_structural() {
        let update = statement_update("device-a", 0, "/doc/s", &[("device-a", 1)]);
        let delete = op(
            "device-b",
            0,
            OperationType::DeleteStatement,
            "/doc/s",
            Value::Null,
            &[("device-b", 1)],
        );
        assert_eq!(
            update.detect_conflict_with(&delete),
            Some(ConflictType::DeletionConflict)
        );

        let other_update = statement_update("device-b", 0, "/doc/s", &[("device-b", 1)]);
        assert_eq!(
            update.detect_conflict_with(&other_update),
            Some(ConflictType::SemanticConflict)
        );

        let arg_a = op(
            "device-a",
            0,
            OperationType::CreateArgument,
            "/doc/arg",
            json!({"id": "a1", "premises": [], "conclusions": []}),
            &[("device-a", 1)],
        );
        let arg_b = op(
            "device-b",
            0,
            OperationType::CreateArgument,
            "/doc/arg",
            json!({"id": "a2", "premises": [], "conclusions": []}),
            &[("device-b", 1)],
        );
        assert_eq!(
            arg_a.detect_conflict_with(&arg_b),
            Some(ConflictType::StructuralConflict)
        );

        // Different paths or causal order never conflict.
        let elsewhere = statement_update("device-b", 0, "/doc/other", &[("device-b", 1)]);
        assert_eq!(update.detect_conflict_with(&elsewhere), None);
        let later = statement_update("device-a", 1, "/doc/s", &[("device-a", 2)]);
        assert_eq!(update.detect_conflict_with(&later), None);
    }

    #[test]
    fn conflict_classification_is_symmetric() {
        let update = statement_update("device-a", 0, "/doc/s", &[("device-a", 1)]);
        let delete = op(
            "device-b",
            0,
            OperationType::DeleteStatement,
            "/doc/s",
            Value::Null,
            &[("device-b", 1)],
        );
        assert_eq!(
            update.detect_conflict_with(&delete),
            delete.detect_conflict_with(&update)
        );
    }

    #[test]
    fn transform_against_folds_over_concurrent_peers() {
        let base = op(
            "device-a",
            0,
            OperationType::UpdateTreePosition,
            "/doc/tree",
            json!({"x": 100.0, "y": 200.0}),
            &[("device-a", 1)],
        );
        let peer1 = op(
            "device-b",
            0,
            OperationType::UpdateTreePosition,
            "/doc/tree",
            json!({"x": 50.0, "y": 30.0}),
            &[("device-b", 1)],
        );
        let peer2 = op(
            "device-c",
            0,
            OperationType::UpdateTreePosition,
            "/doc/tree",
            json!({"x": 10.0, "y": 10.0}),
            &[("device-c", 1)],
        );
        let result = base.transform_against(&[peer1, peer2]).unwrap();
        assert_eq!(result.payload().get_field("x").unwrap().as_f64(), Some(106.0));
        assert_eq!(result.payload().get_field("y").unwrap().as_f64(), Some(204.0));
    }

    #[test]
    fn sequence_transformation_orders_causally_first() {
        let first = statement_update("device-a", 0, "/doc/s", &[("device-a", 1)]);
        let second = statement_update("device-a", 1, "/doc/s", &[("device-a", 2)]);
        let third = statement_update("device-a", 2, "/doc/s", &[("device-a", 3)]);

        let shuffled = vec![third.clone(), first.clone(), second.clone()];
        let ordered = Operation::transform_operation_sequence(&shuffled).unwrap();
        assert_eq!(
            ordered.iter().map(|o| o.id().clone()).collect::<Vec<_>>(),
            vec![first.id().clone(), second.id().clone(), third.id().clone()]
        );
    }

    #[test]
    fn concurrent_groups_require_at_least_two_members() {
        let a = statement_update("device-a", 0, "/doc/s", &[("device-a", 1)]);
        let b = statement_update("device-b", 0, "/doc/s", &[("device-b", 1)]);
        let dependent = statement_update("device-a", 1, "/doc/s", &[("device-a", 2), ("device-b", 1)]);

        let groups = Operation::find_concurrent_groups(&[a.clone(), b.clone(), dependent]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert!(groups[0].contains(&a) && groups[0].contains(&b));

        assert!(Operation::find_concurrent_groups(&[a]).is_empty());
    }

    #[test]
    fn json_round_trip_preserves_all_fields() {
        let original = op(
            "device-a",
            3,
            OperationType::UpdateStatement,
            "/document/title",
            json!({"id": "s1", "content": "Updated"}),
            &[("device-a", 4), ("device-b", 2)],
        );
        let json = original.to_json().unwrap();
        let parsed = Operation::from_json(&json).unwrap();
        assert_eq!(parsed.id(), original.id());
        assert_eq!(parsed.device_id(), original.device_id());
        assert_eq!(parsed.operation_type(), original.operation_type());
        assert_eq!(parsed.target_path(), original.target_path());
        assert_eq!(parsed.payload(), original.payload());
        assert_eq!(parsed.vector_clock(), original.vector_clock());
        assert_eq!(parsed.timestamp(), original.timestamp());
    }

    #[test]
    fn from_json_rejects_missing_required_fields() {
        let missing_device = r#"{
            "id": "op_device-a_0_abc",
            "operationType": "UPDATE_STATEMENT",
            "targetPath": "/doc/s",
            "payload": {"kind": "STATEMENT", "data": {"id": "s1", "content": "x"}},
            "vectorClock": {"device-a": 1},
            "timestamp": {"counter": 1, "tie": "{device-a:1}"}
        }"#;
        assert!(Operation::from_json(missing_device).is_err());

        let blank_path = r#"{
            "id": "op_device-a_0_abc",
            "deviceId": "device-a",
            "operationType": "UPDATE_STATEMENT",
            "targetPath": "  ",
            "payload": {"kind": "STATEMENT", "data": {"id": "s1", "content": "x"}},
            "vectorClock": {"device-a": 1},
            "timestamp": {"counter": 1, "tie": "{device-a:1}"}
        }"#;
        assert!(Operation::from_json(blank_path).is_err());
    }
}
