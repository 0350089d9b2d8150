use crate::conflict::conflict::Conflict;
use crate::conflict::kind::ConflictType;
use crate::error::SyncError;
use crate::identity::{DeviceId, OperationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Operation counts above this drop resolution confidence to LOW.
const LOW_CONFIDENCE_OPERATION_COUNT: usize = 5;

/// Strategies a conflict can be resolved with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    LastWriterWins,
    FirstWriterWins,
    MergeOperations,
    OperationalTransform,
    ThreeWayMerge,
    UserDecisionRequired,
    ManualSelection,
}

pub const ALL_RESOLUTION_STRATEGIES: [ResolutionStrategy; 7] = [
    ResolutionStrategy::LastWriterWins,
    ResolutionStrategy::FirstWriterWins,
    ResolutionStrategy::MergeOperations,
    ResolutionStrategy::OperationalTransform,
    ResolutionStrategy::ThreeWayMerge,
    ResolutionStrategy::UserDecisionRequired,
    ResolutionStrategy::ManualSelection,
];

impl ResolutionStrategy {
    /// Strategies the core may apply without a human in the loop.
    pub fn is_automatic(self) -> bool {
        !self.is_manual()
    }

    pub fn is_manual(self) -> bool {
        matches!(
            self,
            ResolutionStrategy::UserDecisionRequired | ResolutionStrategy::ManualSelection
        )
    }

    /// Merge-style strategies combine both sides instead of picking one.
    pub fn is_merge(self) -> bool {
        matches!(
            self,
            ResolutionStrategy::MergeOperations | ResolutionStrategy::ThreeWayMerge
        )
    }

    pub fn parse(token: &str) -> Result<Self, SyncError> {
        ALL_RESOLUTION_STRATEGIES
            .into_iter()
            .find(|s| s.as_token() == token)
            .ok_or_else(|| SyncError::Validation(format!("unknown resolution strategy: {token}")))
    }

    pub fn as_token(self) -> &'static str {
        match self {
            ResolutionStrategy::LastWriterWins => "LAST_WRITER_WINS",
            ResolutionStrategy::FirstWriterWins => "FIRST_WRITER_WINS",
            ResolutionStrategy::MergeOperations => "MERGE_OPERATIONS",
            ResolutionStrategy::OperationalTransform => "OPERATIONAL_TRANSFORM",
            ResolutionStrategy::ThreeWayMerge => "THREE_WAY_MERGE",
            ResolutionStrategy::UserDecisionRequired => "USER_DECISION_REQUIRED",
            ResolutionStrategy::ManualSelection => "MANUAL_SELECTION",
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Confidence grade attached to a resolution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// The operation a user picked when resolving manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSelection {
    pub selected_operation_id: OperationId,
}

/// Record of how a conflict was settled.
///
/// Automatic resolutions are produced by the core's strategies; manual
/// resolutions carry the user's selection. Dates serialize as ISO-8601.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    strategy: ResolutionStrategy,
    conflict_type: ConflictType,
    confidence: ConfidenceLevel,
    resolved_at: DateTime<Utc>,
    resolved_by: DeviceId,
    context: String,
    result_data: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    user_selection: Option<UserSelection>,
    automatic: bool,
}

impl ConflictResolution {
    /// Records an automatic resolution. The strategy must be one the core
    /// may apply on its own.
    pub fn automatic(
        strategy: ResolutionStrategy,
        conflict: &Conflict,
        resolved_by: DeviceId,
        context: impl Into<String>,
        result_data: Value,
    ) -> Result<Self, SyncError> {
        if !strategy.is_automatic() {
            return Err(SyncError::Validation(format!(
                "{strategy} is not an automatic strategy"
            )));
        }
        Ok(ConflictResolution {
            strategy,
            conflict_type: conflict.conflict_type(),
            confidence: Self::derive_confidence(conflict, &result_data),
            resolved_at: Utc::now(),
            resolved_by,
            context: context.into(),
            result_data,
            user_selection: None,
            automatic: true,
        })
    }

    /// Records a manual resolution with the user's selection.
    pub fn manual(
        strategy: ResolutionStrategy,
        conflict: &Conflict,
        resolved_by: DeviceId,
        context: impl Into<String>,
        result_data: Value,
        selection: UserSelection,
    ) -> Result<Self, SyncError> {
        if !strategy.is_manual() {
            return Err(SyncError::Validation(format!(
                "{strategy} is not a manual strategy"
            )));
        }
        Ok(ConflictResolution {
            strategy,
            conflict_type: conflict.conflict_type(),
            confidence: Self::derive_confidence(conflict, &result_data),
            resolved_at: Utc::now(),
            resolved_by,
            context: context.into(),
            result_data,
            user_selection: Some(selection),
            automatic: false,
        })
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    pub fn conflict_type(&self) -> ConflictType {
        self.conflict_type
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.confidence
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    pub fn resolved_by(&self) -> &DeviceId {
        &self.resolved_by
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn result_data(&self) -> &Value {
        &self.result_data
    }

    pub fn user_selection(&self) -> Option<&UserSelection> {
        self.user_selection.as_ref()
    }

    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    /// A resolution needs human review when confidence is low, the
    /// strategy was manual, or a merge was applied to semantic content.
    pub fn requires_user_validation(&self) -> bool {
        self.confidence == ConfidenceLevel::Low
            || !self.automatic
            || (self.conflict_type.is_semantic() && self.strategy.is_merge())
    }

    // Confidence falls with operation count, semantic content, and an
    // absent result.
    fn derive_confidence(conflict: &Conflict, result_data: &Value) -> ConfidenceLevel {
        if conflict.operations().len() > LOW_CONFIDENCE_OPERATION_COUNT {
            ConfidenceLevel::Low
        } else if conflict.conflict_type().is_semantic() || result_data.is_null() {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }
}
