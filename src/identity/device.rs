use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// Maximum accepted length of a device identifier.
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Length of the short form used inside operation identifiers.
const SHORT_ID_LEN: usize = 8;

/// Opaque, validated device identifier.
///
/// Created once per device install. The value is trimmed, 1 to 64
/// characters long, and restricted to `[A-Za-z0-9_-]`. Equality is by
/// value; the type is usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validates and constructs a device identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, SyncError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(SyncError::Validation(
                "device id must not be empty".into(),
            ));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
        {
            return Err(SyncError::Validation(format!(
                "device id contains invalid character '{bad}'"
            )));
        }
        // Charset is ASCII, so byte length equals character count.
        if trimmed.len() > MAX_DEVICE_ID_LEN {
            return Err(SyncError::Validation(format!(
                "device id exceeds {MAX_DEVICE_ID_LEN} characters"
            )));
        }
        Ok(DeviceId(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 8-character short form embedded in operation identifiers.
    /// Identifiers shorter than 8 characters are returned whole.
    pub fn short_id(&self) -> &str {
        &self.0[..self.0.len().min(SHORT_ID_LEN)]
    }
}

impl TryFrom<String> for DeviceId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
