use crate::error::SyncError;
use crate::identity::{DeviceId, OperationId};
use crate::operation::kind::OperationType;
use crate::operation::op::Operation;
use crate::operation::payload::OperationPayload;
use crate::time::VectorClock;
use serde_json::{json, Value};

/// Inputs for constructing one operation through the factory.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub operation_type: OperationType,
    pub target_path: String,
    pub payload_data: Value,
    pub vector_clock: Option<VectorClock>,
    pub parent_operation_id: Option<OperationId>,
}

impl OperationRequest {
    pub fn new(
        operation_type: OperationType,
        target_path: impl Into<String>,
        payload_data: Value,
    ) -> Self {
        OperationRequest {
            operation_type,
            target_path: target_path.into(),
            payload_data,
            vector_clock: None,
            parent_operation_id: None,
        }
    }

    pub fn with_clock(mut self, clock: VectorClock) -> Self {
        self.vector_clock = Some(clock);
        self
    }

    pub fn with_parent(mut self, parent: OperationId) -> Self {
        self.parent_operation_id = Some(parent);
        self
    }
}

/// Per-device operation construction surface.
///
/// The factory owns the device's monotonic sequence counter and always
/// advances the device's clock entry, so every produced operation
/// satisfies the clock-carries-author invariant by construction.
#[derive(Debug, Clone)]
pub struct OperationFactory {
    device_id: DeviceId,
    next_sequence: u64,
}

impl OperationFactory {
    pub fn new(device_id: DeviceId) -> Self {
        OperationFactory {
            device_id,
            next_sequence: 0,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Builds one operation, consuming the next sequence number.
    pub fn create(&mut self, request: OperationRequest) -> Result<Operation, SyncError> {
        let operation = self.build(request, self.next_sequence)?;
        self.next_sequence += 1;
        Ok(operation)
    }

    /// Builds a batch atomically: every request is validated, all failures
    /// are reported together, and no operation is produced unless all
    /// succeed.
    pub fn create_batch(
        &mut self,
        requests: Vec<OperationRequest>,
    ) -> Result<Vec<Operation>, SyncError> {
        let mut operations = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();
        for (index, request) in requests.into_iter().enumerate() {
            match self.build(request, self.next_sequence + operations.len() as u64) {
                Ok(operation) => operations.push(operation),
                Err(err) => failures.push(format!("request {index}: {err}")),
            }
        }
        if !failures.is_empty() {
            return Err(SyncError::Validation(failures.join("; ")));
        }
        self.next_sequence += operations.len() as u64;
        Ok(operations)
    }

    // ── Convenience constructors ─────────────────────────────────────────

    pub fn statement_create(
        &mut self,
        target_path: impl Into<String>,
        statement_id: &str,
        content: &str,
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::CreateStatement,
            target_path,
            json!({"id": statement_id, "content": content}),
        ))
    }

    pub fn statement_update(
        &mut self,
        target_path: impl Into<String>,
        statement_id: &str,
        content: &str,
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::UpdateStatement,
            target_path,
            json!({"id": statement_id, "content": content}),
        ))
    }

    pub fn argument_create(
        &mut self,
        target_path: impl Into<String>,
        argument_id: &str,
        premises: &[&str],
        conclusions: &[&str],
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::CreateArgument,
            target_path,
            json!({"id": argument_id, "premises": premises, "conclusions": conclusions}),
        ))
    }

    pub fn position_update(
        &mut self,
        target_path: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::UpdateTreePosition,
            target_path,
            json!({"x": x, "y": y}),
        ))
    }

    pub fn connection_create(
        &mut self,
        target_path: impl Into<String>,
        source_id: &str,
        target_id: &str,
        connection_type: &str,
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::CreateConnection,
            target_path,
            json!({
                "sourceId": source_id,
                "targetId": target_id,
                "connectionType": connection_type,
            }),
        ))
    }

    pub fn metadata_update(
        &mut self,
        target_path: impl Into<String>,
        key: &str,
        value: Value,
    ) -> Result<Operation, SyncError> {
        self.create(OperationRequest::new(
            OperationType::UpdateMetadata,
            target_path,
            json!({"key": key, "value": value}),
        ))
    }

    fn build(&self, request: OperationRequest, sequence: u64) -> Result<Operation, SyncError> {
        let base_clock = request
            .vector_clock
            .unwrap_or_else(|| VectorClock::with_device(&self.device_id));
        let clock = base_clock.increment_for(&self.device_id);
        let payload = OperationPayload::new(request.payload_data, request.operation_type)?;
        Operation::new(
            OperationId::generate(&self.device_id, sequence),
            self.device_id.clone(),
            request.operation_type,
            request.target_path,
            payload,
            clock,
            request.parent_operation_id,
        )
    }
}
