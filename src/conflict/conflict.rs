use crate::conflict::kind::{ConflictSeverity, ConflictType};
use crate::conflict::resolution::ResolutionStrategy;
use crate::error::SyncError;
use crate::identity::DeviceId;
use crate::operation::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A resolution strategy offered for a conflict, flagged automatic or
/// manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOption {
    pub strategy: ResolutionStrategy,
    pub automatic: bool,
}

// The recorded outcome once a conflict has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionOutcome {
    resolved_at: DateTime<Utc>,
    strategy: ResolutionStrategy,
    result: Value,
}

/// Two or more concurrent operations contending for one target path.
///
/// Conflicts are created open, with their resolution options generated
/// from the conflict category, and move to resolved exactly once. Dates
/// serialize as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    id: String,
    conflict_type: ConflictType,
    target_path: String,
    operations: Vec<Operation>,
    detected_at: DateTime<Utc>,
    resolution_options: Vec<ResolutionOption>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    resolution: Option<ResolutionOutcome>,
}

impl Conflict {
    /// Validates and constructs an open conflict. Requires a non-blank id
    /// and path, at least two operations, and that every operation
    /// addresses the conflict path.
    pub fn new(
        id: impl Into<String>,
        conflict_type: ConflictType,
        target_path: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Result<Self, SyncError> {
        let id = id.into();
        let target_path = target_path.into();
        if id.trim().is_empty() {
            return Err(SyncError::Validation("conflict id must not be blank".into()));
        }
        if target_path.trim().is_empty() {
            return Err(SyncError::Validation(
                "conflict target path must not be blank".into(),
            ));
        }
        if operations.len() < 2 {
            return Err(SyncError::Validation(
                "a conflict requires at least two operations".into(),
            ));
        }
        if let Some(stray) = operations
            .iter()
            .find(|op| op.target_path() != target_path)
        {
            return Err(SyncError::Validation(format!(
                "operation {} addresses {} instead of the conflict path {target_path}",
                stray.id(),
                stray.target_path()
            )));
        }
        let resolution_options = Self::options_for(conflict_type);
        Ok(Conflict {
            id,
            conflict_type,
            target_path,
            operations,
            detected_at: Utc::now(),
            resolution_options,
            resolution: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conflict_type(&self) -> ConflictType {
        self.conflict_type
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn resolution_options(&self) -> &[ResolutionOption] {
        &self.resolution_options
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolution.as_ref().map(|r| r.resolved_at)
    }

    pub fn resolved_strategy(&self) -> Option<ResolutionStrategy> {
        self.resolution.as_ref().map(|r| r.strategy)
    }

    pub fn resolution_result(&self) -> Option<&Value> {
        self.resolution.as_ref().map(|r| &r.result)
    }

    /// Settles the conflict. The strategy must be one of the generated
    /// options, and resolution happens at most once; a rejected attempt
    /// leaves the conflict unchanged.
    pub fn resolve_with(
        &mut self,
        strategy: ResolutionStrategy,
        result: Value,
    ) -> Result<(), SyncError> {
        if self.resolution.is_some() {
            return Err(SyncError::State(format!(
                "conflict {} is already resolved",
                self.id
            )));
        }
        if !self
            .resolution_options
            .iter()
            .any(|option| option.strategy == strategy)
        {
            return Err(SyncError::State(format!(
                "strategy {strategy} is not offered for conflict {}",
                self.id
            )));
        }
        self.resolution = Some(ResolutionOutcome {
            resolved_at: Utc::now(),
            strategy,
            result,
        });
        Ok(())
    }

    /// The deduplicated set of devices behind the conflicting operations,
    /// in first-seen order.
    pub fn involved_devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = Vec::new();
        for op in &self.operations {
            if !devices.contains(op.device_id()) {
                devices.push(op.device_id().clone());
            }
        }
        devices
    }

    /// The operation whose clock dominates every other, when one exists;
    /// otherwise the operation with the greatest logical timestamp.
    pub fn latest_operation(&self) -> Option<&Operation> {
        let dominant = self.operations.iter().find(|candidate| {
            self.operations.iter().all(|other| {
                candidate.id() == other.id()
                    || candidate.vector_clock().happens_after(other.vector_clock())
            })
        });
        dominant.or_else(|| {
            self.operations
                .iter()
                .max_by(|a, b| a.timestamp().cmp(b.timestamp()))
        })
    }

    pub fn can_be_automatically_resolved(&self) -> bool {
        self.resolution_options.iter().any(|option| option.automatic)
    }

    /// Semantic conflicts always need a user decision, as does any
    /// conflict with no automatic option.
    pub fn requires_user_decision(&self) -> bool {
        self.conflict_type == ConflictType::SemanticConflict
            || !self.can_be_automatically_resolved()
    }

    /// Coarse severity of the conflict object itself: semantic content is
    /// high, wide conflicts are medium, the rest low.
    pub fn severity(&self) -> ConflictSeverity {
        if self.conflict_type == ConflictType::SemanticConflict {
            ConflictSeverity::High
        } else if self.operations.len() > 3 {
            ConflictSeverity::Medium
        } else {
            ConflictSeverity::Low
        }
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(input)?)
    }

    fn options_for(conflict_type: ConflictType) -> Vec<ResolutionOption> {
        match conflict_type {
            ConflictType::StructuralConflict => vec![
                ResolutionOption {
                    strategy: ResolutionStrategy::MergeOperations,
                    automatic: true,
                },
                ResolutionOption {
                    strategy: ResolutionStrategy::LastWriterWins,
                    automatic: true,
                },
            ],
            // Destructive and content conflicts offer the deterministic
            // winner automatically and defer everything else to the user.
            ConflictType::DeletionConflict
            | ConflictType::SemanticConflict
            | ConflictType::ConcurrentModification => vec![
                ResolutionOption {
                    strategy: ResolutionStrategy::LastWriterWins,
                    automatic: true,
                },
                ResolutionOption {
                    strategy: ResolutionStrategy::UserDecisionRequired,
                    automatic: false,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OperationId;
    use crate::operation::{OperationPayload, OperationType};
    use crate::time::VectorClock;
    use serde_json::json;

    fn statement_op(device: &str, path: &str, clock: &[(&str, u64)]) -> Operation {
        let device = DeviceId::new(device).unwrap();
        let clock = VectorClock::from_map(
            clock.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        );
        Operation::new(
            OperationId::generate(&device, 0),
            device,
            OperationType::UpdateStatement,
            path.to_string(),
            OperationPayload::new(json!({"id": "s1", "content": "x"}), OperationType::UpdateStatement)
                .unwrap(),
            clock,
            None,
        )
        .unwrap()
    }

    fn semantic_conflict() -> Conflict {
        let a = statement_op("device-a", "/doc/title", &[("device-a", 1)]);
        let b = statement_op("device-b", "/doc/title", &[("device-b", 1)]);
        Conflict::new(
            "conflict-1",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![a, b],
        )
        .unwrap()
    }

    #[test]
    fn creation_validates_id_path_and_operation_count() {
        let a = statement_op("device-a", "/doc/title", &[("device-a", 1)]);
        let b = statement_op("device-b", "/doc/title", &[("device-b", 1)]);

        assert!(Conflict::new(
            "  ",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![a.clone(), b.clone()]
        )
        .is_err());
        assert!(Conflict::new(
            "c1",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![a.clone()]
        )
        .is_err());

        let stray = statement_op("device-c", "/doc/other", &[("device-c", 1)]);
        assert!(Conflict::new(
            "c1",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![a, stray]
        )
        .is_err());
    }

    #[test]
    fn semantic_conflicts_offer_automatic_lww_and_manual_decision() {
        let conflict = semantic_conflict();
        let options = conflict.resolution_options();
        assert!(options
            .iter()
            .any(|o| o.strategy == ResolutionStrategy::LastWriterWins && o.automatic));
        assert!(options
            .iter()
            .any(|o| o.strategy == ResolutionStrategy::UserDecisionRequired && !o.automatic));
        assert!(conflict.can_be_automatically_resolved());
        assert!(conflict.requires_user_decision());
        assert_eq!(conflict.severity(), ConflictSeverity::High);
    }

    #[test]
    fn structural_conflicts_offer_two_automatic_options() {
        let a = statement_op("device-a", "/doc/arg", &[("device-a", 1)]);
        let b = statement_op("device-b", "/doc/arg", &[("device-b", 1)]);
        let conflict =
            Conflict::new("c2", ConflictType::StructuralConflict, "/doc/arg", vec![a, b]).unwrap();
        assert!(conflict.resolution_options().iter().all(|o| o.automatic));
        assert!(!conflict.requires_user_decision());
        assert_eq!(conflict.severity(), ConflictSeverity::Low);
    }

    #[test]
    fn resolve_with_is_single_shot_and_option_checked() {
        let mut conflict = semantic_conflict();

        // A strategy outside the generated options is refused.
        let err = conflict
            .resolve_with(ResolutionStrategy::ThreeWayMerge, json!({}))
            .unwrap_err();
        assert!(matches!(err, SyncError::State(_)));
        assert!(!conflict.is_resolved());

        conflict
            .resolve_with(ResolutionStrategy::LastWriterWins, json!({"winner": "b"}))
            .unwrap();
        assert!(conflict.is_resolved());
        assert_eq!(
            conflict.resolved_strategy(),
            Some(ResolutionStrategy::LastWriterWins)
        );

        // Double resolution fails and leaves the record intact.
        let err = conflict
            .resolve_with(ResolutionStrategy::UserDecisionRequired, json!({}))
            .unwrap_err();
        assert!(matches!(err, SyncError::State(_)));
        assert_eq!(
            conflict.resolution_result(),
            Some(&json!({"winner": "b"}))
        );
    }

    #[test]
    fn involved_devices_deduplicates() {
        let a = statement_op("device-a", "/doc/title", &[("device-a", 1)]);
        let b = statement_op("device-b", "/doc/title", &[("device-b", 1)]);
        let a_again = statement_op("device-a", "/doc/title", &[("device-a", 2)]);
        let conflict = Conflict::new(
            "c3",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![a, b, a_again],
        )
        .unwrap();
        let devices = conflict.involved_devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].as_str(), "device-a");
        assert_eq!(devices[1].as_str(), "device-b");
    }

    #[test]
    fn latest_operation_prefers_clock_dominance() {
        let early = statement_op("device-a", "/doc/title", &[("device-a", 1)]);
        let late = statement_op("device-b", "/doc/title", &[("device-a", 1), ("device-b", 1)]);
        let conflict = Conflict::new(
            "c4",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![early.clone(), late.clone()],
        )
        .unwrap();
        assert_eq!(conflict.latest_operation().unwrap().id(), late.id());

        // Concurrent operations fall back to the timestamp tiebreak.
        let left = statement_op("device-a", "/doc/title", &[("device-a", 1)]);
        let right = statement_op("device-b", "/doc/title", &[("device-b", 1)]);
        let tied = Conflict::new(
            "c5",
            ConflictType::SemanticConflict,
            "/doc/title",
            vec![left.clone(), right.clone()],
        )
        .unwrap();
        let picked = tied.latest_operation().unwrap();
        assert!(picked.id() == left.id() || picked.id() == right.id());
    }

    #[test]
    fn json_round_trip_preserves_dates_as_iso8601() {
        let conflict = semantic_conflict();
        let json = conflict.to_json().unwrap();
        assert!(json.contains("detectedAt"));
        let parsed = Conflict::from_json(&json).unwrap();
        assert_eq!(parsed, conflict);

        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        let stamp = raw["detectedAt"].as_str().unwrap();
        assert!(stamp.contains('T'), "not ISO-8601: {stamp}");
    }
}
