//! Consumed collaborator interfaces.
//!
//! The core does not persist anything and does not coordinate contexts
//! itself; hosts plug in behind these traits. The in-memory
//! implementations exist for unit tests and as templates for real
//! adapters.

use crate::conflict::Conflict;
use crate::error::SyncError;
use crate::identity::{DeviceId, OperationId};
use crate::operation::{Operation, OperationType};
use crate::time::LogicalTimestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Storage surface for operations.
pub trait OperationRepository {
    fn save(&mut self, operation: &Operation) -> Result<(), SyncError>;
    fn find_by_id(&self, id: &OperationId) -> Result<Option<Operation>, SyncError>;
    fn find_by_device(&self, device: &DeviceId) -> Result<Vec<Operation>, SyncError>;
    fn find_by_type(&self, operation_type: OperationType) -> Result<Vec<Operation>, SyncError>;
    /// Operations saved but not yet applied by the host.
    fn find_pending(&self) -> Result<Vec<Operation>, SyncError>;
    /// Operations whose logical timestamp is strictly after the given one.
    fn find_after(&self, timestamp: &LogicalTimestamp) -> Result<Vec<Operation>, SyncError>;
    fn find_all(&self) -> Result<Vec<Operation>, SyncError>;
    fn delete(&mut self, id: &OperationId) -> Result<(), SyncError>;
}

/// Storage surface for conflicts.
pub trait ConflictRepository {
    fn save(&mut self, conflict: &Conflict) -> Result<(), SyncError>;
    fn find_by_id(&self, id: &str) -> Result<Option<Conflict>, SyncError>;
    fn find_by_target_path(&self, target_path: &str) -> Result<Vec<Conflict>, SyncError>;
    fn find_unresolved(&self) -> Result<Vec<Conflict>, SyncError>;
    fn find_all(&self) -> Result<Vec<Conflict>, SyncError>;
    fn delete(&mut self, id: &str) -> Result<(), SyncError>;
}

/// The cross-context coordination contexts a host validates requests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncContext {
    ProofValidation,
    PackageInstallation,
    DeviceSynchronization,
}

impl SyncContext {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncContext::ProofValidation => "PROOF_VALIDATION",
            SyncContext::PackageInstallation => "PACKAGE_INSTALLATION",
            SyncContext::DeviceSynchronization => "DEVICE_SYNCHRONIZATION",
        }
    }
}

impl std::fmt::Display for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The orchestration host that fans work across contexts. It supplies the
/// local device identity, accepts operations the core produces, and
/// reports per-context timeouts through `SyncError::Timeout`.
pub trait OrchestrationHost {
    fn local_device(&self) -> Result<DeviceId, SyncError>;
    fn submit_operation(&mut self, operation: Operation) -> Result<(), SyncError>;

    /// Builds the timeout error a host reports when `context` exceeds its
    /// budget.
    fn timeout_error(&self, context: SyncContext, timeout_ms: u64) -> SyncError {
        SyncError::Timeout {
            context: context.as_str().to_string(),
            timeout_ms,
        }
    }
}

/// Map-backed operation store for tests and as an adapter template.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOperationRepository {
    operations: BTreeMap<OperationId, Operation>,
    applied: BTreeSet<OperationId>,
}

impl InMemoryOperationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an operation as applied, removing it from the pending set.
    pub fn mark_applied(&mut self, id: &OperationId) -> Result<(), SyncError> {
        if !self.operations.contains_key(id) {
            return Err(SyncError::State(format!("unknown operation {id}")));
        }
        self.applied.insert(id.clone());
        Ok(())
    }
}

impl OperationRepository for InMemoryOperationRepository {
    fn save(&mut self, operation: &Operation) -> Result<(), SyncError> {
        self.operations
            .insert(operation.id().clone(), operation.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &OperationId) -> Result<Option<Operation>, SyncError> {
        Ok(self.operations.get(id).cloned())
    }

    fn find_by_device(&self, device: &DeviceId) -> Result<Vec<Operation>, SyncError> {
        Ok(self
            .operations
            .values()
            .filter(|op| op.device_id() == device)
            .cloned()
            .collect())
    }

    fn find_by_type(&self, operation_type: OperationType) -> Result<Vec<Operation>, SyncError> {
        Ok(self
            .operations
            .values()
            .filter(|op| op.operation_type() == operation_type)
            .cloned()
            .collect())
    }

    fn find_pending(&self) -> Result<Vec<Operation>, SyncError> {
        Ok(self
            .operations
            .values()
            .filter(|op| !self.applied.contains(op.id()))
            .cloned()
            .collect())
    }

    fn find_after(&self, timestamp: &LogicalTimestamp) -> Result<Vec<Operation>, SyncError> {
        Ok(self
            .operations
            .values()
            .filter(|op| op.timestamp() > timestamp)
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<Operation>, SyncError> {
        Ok(self.operations.values().cloned().collect())
    }

    fn delete(&mut self, id: &OperationId) -> Result<(), SyncError> {
        if self.operations.remove(id).is_none() {
            return Err(SyncError::State(format!("unknown operation {id}")));
        }
        self.applied.remove(id);
        Ok(())
    }
}

/// Map-backed conflict store for tests and as an adapter template.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConflictRepository {
    conflicts: BTreeMap<String, Conflict>,
}

impl InMemoryConflictRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConflictRepository for InMemoryConflictRepository {
    fn save(&mut self, conflict: &Conflict) -> Result<(), SyncError> {
        self.conflicts
            .insert(conflict.id().to_string(), conflict.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Conflict>, SyncError> {
        Ok(self.conflicts.get(id).cloned())
    }

    fn find_by_target_path(&self, target_path: &str) -> Result<Vec<Conflict>, SyncError> {
        Ok(self
            .conflicts
            .values()
            .filter(|c| c.target_path() == target_path)
            .cloned()
            .collect())
    }

    fn find_unresolved(&self) -> Result<Vec<Conflict>, SyncError> {
        Ok(self
            .conflicts
            .values()
            .filter(|c| !c.is_resolved())
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<Conflict>, SyncError> {
        Ok(self.conflicts.values().cloned().collect())
    }

    fn delete(&mut self, id: &str) -> Result<(), SyncError> {
        if self.conflicts.remove(id).is_none() {
            return Err(SyncError::State(format!("unknown conflict {id}")));
        }
        Ok(())
    }
}
