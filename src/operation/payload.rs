use crate::error::SyncError;
use crate::operation::kind::OperationType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on the serialized payload body, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

// Fraction of the peer's coordinates folded in by the position offset rule.
const POSITION_OFFSET_FACTOR: f64 = 0.1;

/// The payload shape an operation carries, derived from its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadKind {
    Statement,
    Argument,
    Tree,
    Position,
    Connection,
    Metadata,
    Empty,
    Generic,
}

/// Immutable, validated operation payload.
///
/// The body is a JSON value validated once at construction against the
/// kind's required fields, then read-only. Transformation trace fields
/// added by the transformer live alongside the domain fields, which is why
/// the body stays a map rather than a fixed struct per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    kind: PayloadKind,
    data: Value,
}

impl OperationPayload {
    /// Validates `data` against the payload kind required by `op_type`.
    pub fn new(data: Value, op_type: OperationType) -> Result<Self, SyncError> {
        Self::with_kind(data, op_type.payload_kind())
    }

    /// Validates `data` against an explicit kind.
    pub fn with_kind(data: Value, kind: PayloadKind) -> Result<Self, SyncError> {
        validate_shape(kind, &data)?;
        let size = serde_json::to_vec(&data)?.len();
        if size > MAX_PAYLOAD_BYTES {
            return Err(SyncError::Validation(format!(
                "payload of {size} bytes exceeds the {MAX_PAYLOAD_BYTES} byte bound"
            )));
        }
        Ok(OperationPayload { kind, data })
    }

    /// The empty payload carried by deletions.
    pub fn empty() -> Self {
        OperationPayload {
            kind: PayloadKind::Empty,
            data: Value::Null,
        }
    }

    /// Wraps an arbitrary value without shape validation (size is still
    /// bounded).
    pub fn generic(data: Value) -> Result<Self, SyncError> {
        Self::with_kind(data, PayloadKind::Generic)
    }

    // Internal constructor for transformation successors; the body has
    // already passed through a validated payload.
    pub(crate) fn from_parts(kind: PayloadKind, data: Value) -> Self {
        OperationPayload { kind, data }
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Field presence for object bodies; non-objects have no fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.data.as_object().is_some_and(|map| map.contains_key(field))
    }

    pub fn get_field(&self, field: &str) -> Option<&Value> {
        self.data.as_object()?.get(field)
    }

    /// Deep copy through a serialization round-trip.
    pub fn try_clone(&self) -> Result<Self, SyncError> {
        let encoded = serde_json::to_string(&self.data)?;
        Ok(OperationPayload {
            kind: self.kind,
            data: serde_json::from_str(&encoded)?,
        })
    }

    /// Positional offset rule: `x' = x + otherX * 0.1`, same for `y`.
    ///
    /// Applies only when this payload is TREE or POSITION kinded and both
    /// sides expose coordinates; every other pairing returns self
    /// unchanged.
    pub fn position_offset(&self, other: &OperationPayload) -> OperationPayload {
        let (Some((x, y)), Some((ox, oy))) = (self.coordinates(), other.coordinates()) else {
            return self.clone();
        };
        let mut data = self.data.clone();
        let updated_x = x + ox * POSITION_OFFSET_FACTOR;
        let updated_y = y + oy * POSITION_OFFSET_FACTOR;
        match self.kind {
            PayloadKind::Position => {
                if let Some(map) = data.as_object_mut() {
                    map.insert("x".into(), json_number(updated_x));
                    map.insert("y".into(), json_number(updated_y));
                }
            }
            PayloadKind::Tree => {
                if let Some(position) = data
                    .as_object_mut()
                    .and_then(|map| map.get_mut("position"))
                    .and_then(Value::as_object_mut)
                {
                    position.insert("x".into(), json_number(updated_x));
                    position.insert("y".into(), json_number(updated_y));
                }
            }
            _ => return self.clone(),
        }
        OperationPayload::from_parts(self.kind, data)
    }

    /// Shallow right-biased merge for object bodies: keys from `other`
    /// override self. Non-object input on either side is a no-op.
    pub fn content_merge(&self, other: &OperationPayload) -> OperationPayload {
        let (Some(own), Some(theirs)) = (self.data.as_object(), other.data.as_object()) else {
            return self.clone();
        };
        let mut merged = own.clone();
        for (key, value) in theirs {
            merged.insert(key.clone(), value.clone());
        }
        OperationPayload::from_parts(self.kind, Value::Object(merged))
    }

    /// Metadata merge for payloads sharing the same `key`: the other value
    /// wins and the own value is preserved as `previousValue`. Differing
    /// keys are a no-op.
    pub fn metadata_merge(&self, other: &OperationPayload) -> OperationPayload {
        let (Some(own_key), Some(other_key)) = (self.get_field("key"), other.get_field("key"))
        else {
            return self.clone();
        };
        if own_key != other_key {
            return self.clone();
        }
        let mut merged = Map::new();
        merged.insert("key".into(), own_key.clone());
        merged.insert(
            "value".into(),
            other.get_field("value").cloned().unwrap_or(Value::Null),
        );
        merged.insert(
            "previousValue".into(),
            self.get_field("value").cloned().unwrap_or(Value::Null),
        );
        OperationPayload::from_parts(self.kind, Value::Object(merged))
    }

    /// Whether this payload exposes coordinates under the positional
    /// rules (top-level for POSITION, nested for TREE).
    pub fn is_positional(&self) -> bool {
        self.coordinates().is_some()
    }

    // Coordinates for positional payloads: top-level for POSITION, nested
    // under `position` for TREE.
    fn coordinates(&self) -> Option<(f64, f64)> {
        let holder = match self.kind {
            PayloadKind::Position => self.data.as_object()?,
            PayloadKind::Tree => self.data.as_object()?.get("position")?.as_object()?,
            _ => return None,
        };
        Some((holder.get("x")?.as_f64()?, holder.get("y")?.as_f64()?))
    }
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn validate_shape(kind: PayloadKind, data: &Value) -> Result<(), SyncError> {
    match kind {
        PayloadKind::Statement => {
            let map = require_object(data, "statement")?;
            require_string(map, "id", "statement")?;
            require_string(map, "content", "statement")?;
            optional_object(map, "metadata", "statement")?;
        }
        PayloadKind::Argument => {
            let map = require_object(data, "argument")?;
            require_string(map, "id", "argument")?;
            require_string_array(map, "premises", "argument")?;
            require_string_array(map, "conclusions", "argument")?;
            optional_object(map, "metadata", "argument")?;
        }
        PayloadKind::Tree => {
            let map = require_object(data, "tree")?;
            require_string(map, "id", "tree")?;
            require_string(map, "rootNodeId", "tree")?;
            let position = map
                .get("position")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    SyncError::Validation("tree payload requires a position object".into())
                })?;
            require_number(position, "x", "tree position")?;
            require_number(position, "y", "tree position")?;
            optional_object(map, "metadata", "tree")?;
        }
        PayloadKind::Position => {
            let map = require_object(data, "position")?;
            require_number(map, "x", "position")?;
            require_number(map, "y", "position")?;
            if let Some(z) = map.get("z") {
                if !z.is_number() {
                    return Err(SyncError::Validation(
                        "position payload field z must be numeric".into(),
                    ));
                }
            }
        }
        PayloadKind::Connection => {
            let map = require_object(data, "connection")?;
            require_string(map, "sourceId", "connection")?;
            require_string(map, "targetId", "connection")?;
            require_string(map, "connectionType", "connection")?;
            optional_object(map, "metadata", "connection")?;
        }
        PayloadKind::Metadata => {
            let map = require_object(data, "metadata")?;
            require_string(map, "key", "metadata")?;
            if !map.contains_key("value") {
                return Err(SyncError::Validation(
                    "metadata payload requires a value field".into(),
                ));
            }
        }
        PayloadKind::Empty => {
            let acceptable =
                data.is_null() || data.as_object().is_some_and(|map| map.is_empty());
            if !acceptable {
                return Err(SyncError::Validation(
                    "deletion payloads must be empty".into(),
                ));
            }
        }
        PayloadKind::Generic => {}
    }
    Ok(())
}

fn require_object<'a>(data: &'a Value, kind: &str) -> Result<&'a Map<String, Value>, SyncError> {
    data.as_object()
        .ok_or_else(|| SyncError::Validation(format!("{kind} payload must be an object")))
}

fn require_string(map: &Map<String, Value>, field: &str, kind: &str) -> Result<(), SyncError> {
    match map.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(SyncError::Validation(format!(
            "{kind} payload requires a non-empty string field {field}"
        ))),
    }
}

fn require_number(map: &Map<String, Value>, field: &str, kind: &str) -> Result<(), SyncError> {
    if map.get(field).is_some_and(Value::is_number) {
        Ok(())
    } else {
        Err(SyncError::Validation(format!(
            "{kind} payload requires a numeric field {field}"
        )))
    }
}

fn require_string_array(
    map: &Map<String, Value>,
    field: &str,
    kind: &str,
) -> Result<(), SyncError> {
    let valid = map.get(field).and_then(Value::as_array).is_some_and(|items| {
        items.iter().all(|item| item.is_string())
    });
    if valid {
        Ok(())
    } else {
        Err(SyncError::Validation(format!(
            "{kind} payload requires a string array field {field}"
        )))
    }
}

fn optional_object(map: &Map<String, Value>, field: &str, kind: &str) -> Result<(), SyncError> {
    match map.get(field) {
        None => Ok(()),
        Some(value) if value.is_object() => Ok(()),
        Some(_) => Err(SyncError::Validation(format!(
            "{kind} payload field {field} must be an object when present"
        ))),
    }
}
