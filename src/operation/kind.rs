use crate::error::SyncError;
use crate::operation::payload::PayloadKind;
use serde::{Deserialize, Serialize};

/// Closed enumeration of operation types.
///
/// The set is `{CREATE,UPDATE,DELETE} x {STATEMENT,ARGUMENT,TREE,CONNECTION}`
/// plus the two special updates `UPDATE_TREE_POSITION` and
/// `UPDATE_METADATA`. Every value carries a verb, a target, and a category;
/// the structural and semantic categories partition the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    CreateStatement,
    UpdateStatement,
    DeleteStatement,
    CreateArgument,
    UpdateArgument,
    DeleteArgument,
    CreateTree,
    UpdateTree,
    DeleteTree,
    CreateConnection,
    UpdateConnection,
    DeleteConnection,
    UpdateTreePosition,
    UpdateMetadata,
}

/// The mutation verb of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationVerb {
    Create,
    Update,
    Delete,
}

/// The addressed entity class of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationTarget {
    Statement,
    Argument,
    Tree,
    Connection,
    TreePosition,
    Metadata,
}

/// Structural operations manipulate graph shape; semantic operations
/// manipulate content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationCategory {
    Structural,
    Semantic,
}

use OperationType::*;

/// Every operation type, for exhaustive table checks.
pub const ALL_OPERATION_TYPES: [OperationType; 14] = [
    CreateStatement,
    UpdateStatement,
    DeleteStatement,
    CreateArgument,
    UpdateArgument,
    DeleteArgument,
    CreateTree,
    UpdateTree,
    DeleteTree,
    CreateConnection,
    UpdateConnection,
    DeleteConnection,
    UpdateTreePosition,
    UpdateMetadata,
];

// Structural pairs that never commute, in either order.
const NON_COMMUTING_STRUCTURAL: [(OperationType, OperationType); 5] = [
    (CreateArgument, DeleteArgument),
    (CreateTree, DeleteTree),
    (CreateConnection, DeleteConnection),
    (DeleteArgument, CreateConnection),
    (DeleteTree, CreateArgument),
];

impl OperationType {
    /// Parses the SCREAMING_SNAKE token form. Unknown tokens are a
    /// validation error.
    pub fn parse(token: &str) -> Result<Self, SyncError> {
        ALL_OPERATION_TYPES
            .into_iter()
            .find(|ty| ty.as_token() == token)
            .ok_or_else(|| SyncError::Validation(format!("unknown operation type: {token}")))
    }

    pub fn as_token(self) -> &'static str {
        match self {
            CreateStatement => "CREATE_STATEMENT",
            UpdateStatement => "UPDATE_STATEMENT",
            DeleteStatement => "DELETE_STATEMENT",
            CreateArgument => "CREATE_ARGUMENT",
            UpdateArgument => "UPDATE_ARGUMENT",
            DeleteArgument => "DELETE_ARGUMENT",
            CreateTree => "CREATE_TREE",
            UpdateTree => "UPDATE_TREE",
            DeleteTree => "DELETE_TREE",
            CreateConnection => "CREATE_CONNECTION",
            UpdateConnection => "UPDATE_CONNECTION",
            DeleteConnection => "DELETE_CONNECTION",
            UpdateTreePosition => "UPDATE_TREE_POSITION",
            UpdateMetadata => "UPDATE_METADATA",
        }
    }

    pub fn verb(self) -> OperationVerb {
        match self {
            CreateStatement | CreateArgument | CreateTree | CreateConnection => {
                OperationVerb::Create
            }
            DeleteStatement | DeleteArgument | DeleteTree | DeleteConnection => {
                OperationVerb::Delete
            }
            UpdateStatement | UpdateArgument | UpdateTree | UpdateConnection
            | UpdateTreePosition | UpdateMetadata => OperationVerb::Update,
        }
    }

    pub fn target(self) -> OperationTarget {
        match self {
            CreateStatement | UpdateStatement | DeleteStatement => OperationTarget::Statement,
            CreateArgument | UpdateArgument | DeleteArgument => OperationTarget::Argument,
            CreateTree | UpdateTree | DeleteTree => OperationTarget::Tree,
            CreateConnection | UpdateConnection | DeleteConnection => OperationTarget::Connection,
            UpdateTreePosition => OperationTarget::TreePosition,
            UpdateMetadata => OperationTarget::Metadata,
        }
    }

    pub fn category(self) -> OperationCategory {
        match self {
            CreateArgument | DeleteArgument | CreateTree | UpdateTreePosition | DeleteTree
            | CreateConnection | DeleteConnection => OperationCategory::Structural,
            _ => OperationCategory::Semantic,
        }
    }

    pub fn is_structural(self) -> bool {
        self.category() == OperationCategory::Structural
    }

    pub fn is_semantic(self) -> bool {
        self.category() == OperationCategory::Semantic
    }

    pub fn is_creation(self) -> bool {
        self.verb() == OperationVerb::Create
    }

    pub fn is_update(self) -> bool {
        self.verb() == OperationVerb::Update
    }

    pub fn is_deletion(self) -> bool {
        self.verb() == OperationVerb::Delete
    }

    /// The payload kind an operation of this type must carry. Deletions
    /// carry no body.
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            CreateStatement | UpdateStatement => PayloadKind::Statement,
            CreateArgument | UpdateArgument => PayloadKind::Argument,
            CreateTree | UpdateTree => PayloadKind::Tree,
            CreateConnection | UpdateConnection => PayloadKind::Connection,
            UpdateTreePosition => PayloadKind::Position,
            UpdateMetadata => PayloadKind::Metadata,
            DeleteStatement | DeleteArgument | DeleteTree | DeleteConnection => PayloadKind::Empty,
        }
    }

    /// Whether two operation types commute. Symmetric by construction.
    ///
    /// Same type commutes only for the two repeatable updates. Structural
    /// pairs commute unless listed in the fixed non-commuting table.
    /// Semantic pairs never commute. A structural and a semantic operation
    /// commute unless the structural one is a deletion.
    pub fn can_commute_with(self, other: OperationType) -> bool {
        if self == other {
            return matches!(self, UpdateTreePosition | UpdateMetadata);
        }
        match (self.is_structural(), other.is_structural()) {
            (true, true) => !NON_COMMUTING_STRUCTURAL
                .iter()
                .any(|(a, b)| (*a, *b) == (self, other) || (*a, *b) == (other, self)),
            (false, false) => false,
            (true, false) => !self.is_deletion(),
            (false, true) => !other.is_deletion(),
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}
