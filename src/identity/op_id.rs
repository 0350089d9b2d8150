use crate::error::SyncError;
use crate::identity::DeviceId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum accepted length of an operation identifier.
pub const MAX_OPERATION_ID_LEN: usize = 128;

/// Structured operation identifier.
///
/// Two generated shapes exist: `op_{short}_{seq}_{wallclock}` where the
/// wall clock is base36 milliseconds, and `op_{short}_{uuidv4}`. The wall
/// clock digits are advisory only; logical timestamps govern ordering.
/// Arbitrary identifiers are accepted as long as they stay within the
/// charset `[A-Za-z0-9_:.\-]` and 1 to 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationId(String);

impl OperationId {
    /// Validates and constructs an identifier from a raw string.
    pub fn new(value: impl Into<String>) -> Result<Self, SyncError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SyncError::Validation(
                "operation id must not be empty".into(),
            ));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(*c, '_' | ':' | '.' | '-'))
        {
            return Err(SyncError::Validation(format!(
                "operation id contains invalid character '{bad}'"
            )));
        }
        if value.len() > MAX_OPERATION_ID_LEN {
            return Err(SyncError::Validation(format!(
                "operation id exceeds {MAX_OPERATION_ID_LEN} characters"
            )));
        }
        Ok(OperationId(value))
    }

    /// Generates a sequence-bearing identifier for the given device.
    pub fn generate(device: &DeviceId, sequence: u64) -> Self {
        let wall = base36(wall_clock_ms());
        OperationId(format!("op_{}_{}_{}", device.short_id(), sequence, wall))
    }

    /// Generates a UUID-v4 identifier for the given device.
    pub fn generate_with_uuid(device: &DeviceId) -> Self {
        OperationId(format!("op_{}_{}", device.short_id(), uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The device short-id segment, when the identifier carries one.
    ///
    /// Short ids may themselves contain underscores, so the trailing
    /// segments are recognised first and the remainder is the short id.
    pub fn device_short(&self) -> Option<String> {
        let parts = self.generated_parts()?;
        match self.shape(&parts)? {
            IdShape::Sequenced => Some(parts[..parts.len() - 2].join("_")),
            IdShape::Uuid => Some(parts[..parts.len() - 1].join("_")),
        }
    }

    /// The embedded sequence number, when present.
    pub fn sequence(&self) -> Option<u64> {
        let parts = self.generated_parts()?;
        match self.shape(&parts)? {
            IdShape::Sequenced => parts[parts.len() - 2].parse().ok(),
            IdShape::Uuid => None,
        }
    }

    /// The embedded wall-clock milliseconds, when present.
    pub fn wall_clock(&self) -> Option<u64> {
        let parts = self.generated_parts()?;
        match self.shape(&parts)? {
            IdShape::Sequenced => u64::from_str_radix(parts[parts.len() - 1], 36).ok(),
            IdShape::Uuid => None,
        }
    }

    /// Orders by sequence when both identifiers carry one, otherwise
    /// lexicographically.
    pub fn compare_by_sequence(&self, other: &OperationId) -> Ordering {
        match (self.sequence(), other.sequence()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }

    fn generated_parts(&self) -> Option<Vec<&str>> {
        let rest = self.0.strip_prefix("op_")?;
        Some(rest.split('_').collect())
    }

    fn shape(&self, parts: &[&str]) -> Option<IdShape> {
        let last = *parts.last()?;
        if parts.len() >= 3
            && parts[parts.len() - 2].bytes().all(|b| b.is_ascii_digit())
            && !parts[parts.len() - 2].is_empty()
            && is_base36(last)
        {
            return Some(IdShape::Sequenced);
        }
        if parts.len() >= 2 && last.contains('-') {
            return Some(IdShape::Uuid);
        }
        None
    }
}

#[derive(Clone, Copy)]
enum IdShape {
    Sequenced,
    Uuid,
}

impl TryFrom<String> for OperationId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OperationId::new(value)
    }
}

impl From<OperationId> for String {
    fn from(id: OperationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn is_base36(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}
