#![no_main]

// Harness: clock_compare – merge/dominance algebra never panics and the
// merge result dominates (or equals) both inputs.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use proofsync_core::VectorClock;
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
struct ClockPair {
    left: Vec<(String, u64)>,
    right: Vec<(String, u64)>,
}

fn build(entries: Vec<(String, u64)>) -> VectorClock {
    VectorClock::from_map(entries.into_iter().collect::<BTreeMap<_, _>>())
}

fuzz_target!(|pair: ClockPair| {
    let left = build(pair.left);
    let right = build(pair.right);

    let merged = left.merged_with(&right);
    assert_eq!(merged, right.merged_with(&left));
    assert!(!merged.happens_before(&left));
    assert!(!merged.happens_before(&right));

    // The order relations stay mutually exclusive.
    let held = [
        left.happens_before(&right),
        left.happens_after(&right),
        left == right,
    ]
    .iter()
    .filter(|r| **r)
    .count();
    assert!(held <= 1);
    if held == 0 {
        assert!(left.is_concurrent_with(&right));
    }

    let _ = left.to_compact_string();
    let _ = left.device_ids();
});
