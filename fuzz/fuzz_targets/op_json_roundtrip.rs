#![no_main]

// Harness: op_json_roundtrip – arbitrary bytes never panic the parser,
// and anything that parses re-serializes to an equivalent operation.

use libfuzzer_sys::fuzz_target;
use proofsync_core::Operation;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(op) = Operation::from_json(input) {
        let rendered = op.to_json().expect("parsed operations re-serialize");
        let back = Operation::from_json(&rendered).expect("rendered operations re-parse");
        assert_eq!(back, op);
        assert_eq!(back.vector_clock(), op.vector_clock());
        assert_eq!(back.payload(), op.payload());
    }
});
