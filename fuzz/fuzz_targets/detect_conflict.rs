#![no_main]

// Harness: detect_conflict – pairwise detection over arbitrary operation
// pairs never panics and stays symmetric.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use proofsync_core::{
    ConflictDetectionService, DeviceId, Operation, OperationId, OperationPayload, OperationType,
    VectorClock,
};
use std::collections::BTreeMap;

const TYPES: [OperationType; 14] = [
    OperationType::CreateStatement,
    OperationType::UpdateStatement,
    OperationType::DeleteStatement,
    OperationType::CreateArgument,
    OperationType::UpdateArgument,
    OperationType::DeleteArgument,
    OperationType::CreateTree,
    OperationType::UpdateTree,
    OperationType::DeleteTree,
    OperationType::CreateConnection,
    OperationType::UpdateConnection,
    OperationType::DeleteConnection,
    OperationType::UpdateTreePosition,
    OperationType::UpdateMetadata,
];

#[derive(Arbitrary, Debug)]
struct OpFrame {
    device: u8,
    ty: u8,
    same_path: bool,
    clock: Vec<(u8, u8)>,
}

fn build(frame: &OpFrame) -> Option<Operation> {
    let device = DeviceId::new(format!("device-{}", frame.device % 4)).ok()?;
    let ty = TYPES[frame.ty as usize % TYPES.len()];
    let mut entries: BTreeMap<String, u64> = frame
        .clock
        .iter()
        .map(|(d, v)| (format!("device-{}", d % 4), *v as u64))
        .collect();
    entries.entry(device.as_str().to_string()).or_insert(1);
    let path = if frame.same_path {
        "/shared".to_string()
    } else {
        format!("/device/{}", frame.device % 4)
    };
    let body = match ty.payload_kind() {
        proofsync_core::PayloadKind::Statement => {
            serde_json::json!({"id": "s", "content": "c"})
        }
        proofsync_core::PayloadKind::Argument => {
            serde_json::json!({"id": "a", "premises": [], "conclusions": []})
        }
        proofsync_core::PayloadKind::Tree => {
            serde_json::json!({"id": "t", "rootNodeId": "n", "position": {"x": 0.0, "y": 0.0}})
        }
        proofsync_core::PayloadKind::Position => serde_json::json!({"x": 0.0, "y": 0.0}),
        proofsync_core::PayloadKind::Connection => {
            serde_json::json!({"sourceId": "a", "targetId": "b", "connectionType": "t"})
        }
        proofsync_core::PayloadKind::Metadata => serde_json::json!({"key": "k", "value": "v"}),
        _ => serde_json::Value::Null,
    };
    Operation::new(
        OperationId::generate(&device, frame.device as u64),
        device,
        ty,
        path,
        OperationPayload::new(body, ty).ok()?,
        VectorClock::from_map(entries),
        None,
    )
    .ok()
}

fuzz_target!(|frames: (OpFrame, OpFrame)| {
    let (Some(a), Some(b)) = (build(&frames.0), build(&frames.1)) else {
        return;
    };

    let forward = a.detect_conflict_with(&b);
    let backward = b.detect_conflict_with(&a);
    assert_eq!(forward, backward);

    let service = ConflictDetectionService::new();
    if let Ok(Some(conflict)) = service.detect_between(&a, &b) {
        assert!(conflict.operations().len() >= 2);
        let _ = service.analyze_severity(&conflict);
        let _ = service.estimate_complexity(&conflict);
        let _ = service.can_auto_resolve(&conflict);
    }
    let _ = service.can_operations_conflict(&a, &b);
    let _ = service.determine_conflict_type(&a, &b);
});
