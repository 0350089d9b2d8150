//! Vector clock implementation for the synchronization core.
//!
//! A clock maps device identifiers to non-negative counters. All
//! operations are pure: successors are returned as fresh values and the
//! receiver is never mutated. Keys are held as raw strings because clocks
//! received from peers may carry entries whose keys fail `DeviceId`
//! validation; such entries still participate in ordering but are skipped
//! by `device_ids`.

use crate::identity::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping `device -> counter` encoding causal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    entries: BTreeMap<String, u64>,
}

impl VectorClock {
    /// The clock with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A clock seeded with the given device at 0.
    pub fn with_device(device: &DeviceId) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(device.as_str().to_string(), 0);
        VectorClock { entries }
    }

    /// Builds a clock from raw entries. Counters are unsigned by type, so
    /// negative values are rejected before they can reach this call (JSON
    /// deserialization fails on them).
    pub fn from_map(entries: BTreeMap<String, u64>) -> Self {
        VectorClock { entries }
    }

    /// Returns a successor clock with the device's counter advanced by
    /// one. An absent device enters at 1.
    pub fn increment_for(&self, device: &DeviceId) -> VectorClock {
        let mut entries = self.entries.clone();
        entries
            .entry(device.as_str().to_string())
            .and_modify(|c| *c = c.saturating_add(1))
            .or_insert(1);
        VectorClock { entries }
    }

    /// Entrywise maximum over the union of both domains. Commutative and
    /// associative.
    pub fn merged_with(&self, other: &VectorClock) -> VectorClock {
        let mut entries = self.entries.clone();
        for (device, incoming) in &other.entries {
            let counter = entries.entry(device.clone()).or_insert(0);
            *counter = (*counter).max(*incoming);
        }
        VectorClock { entries }
    }

    /// True iff this clock dominates `other`: every entry over the union
    /// of domains is at least as large (missing entries count as 0) and at
    /// least one is strictly larger.
    pub fn happens_after(&self, other: &VectorClock) -> bool {
        let (self_ge, strict) = self.dominates(other);
        self_ge && strict
    }

    pub fn happens_before(&self, other: &VectorClock) -> bool {
        other.happens_after(self)
    }

    /// True iff the clocks differ and neither dominates the other.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self != other && !self.happens_after(other) && !other.happens_after(self)
    }

    /// The counter recorded for a device, or 0 when absent.
    pub fn timestamp_for(&self, device: &DeviceId) -> u64 {
        self.counter_for(device.as_str())
    }

    /// Raw-key accessor used when comparing against foreign clocks.
    pub fn counter_for(&self, key: &str) -> u64 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    /// The valid device identifiers in this clock's domain. Keys that
    /// fail `DeviceId` validation are silently skipped.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.entries
            .keys()
            .filter_map(|key| DeviceId::new(key.as_str()).ok())
            .collect()
    }

    /// Compact rendering `{d1:v1,d2:v2}` with keys in lexicographic order.
    pub fn to_compact_string(&self) -> String {
        let body = self
            .entries
            .iter()
            .map(|(device, counter)| format!("{device}:{counter}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{body}}}")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.entries.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sum of all counters; strictly increases along every causal edge,
    /// which makes it usable as a topological sort key.
    pub fn total(&self) -> u64 {
        self.entries.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    // Returns (self >= other pointwise, strictly greater somewhere) over
    // the union of domains.
    fn dominates(&self, other: &VectorClock) -> (bool, bool) {
        let mut self_ge = true;
        let mut strict = false;

        for (device, own) in &self.entries {
            let theirs = other.counter_for(device);
            if *own < theirs {
                self_ge = false;
                break;
            }
            if *own > theirs {
                strict = true;
            }
        }
        if self_ge {
            for (device, theirs) in &other.entries {
                if self.counter_for(device) < *theirs {
                    self_ge = false;
                    break;
                }
            }
        }
        (self_ge, strict)
    }
}
