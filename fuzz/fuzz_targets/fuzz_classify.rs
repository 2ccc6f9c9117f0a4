//! Fuzz target for the classifier entry point.
//!
//! Any input must produce a verdict without panicking, and classification
//! must be deterministic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use no_verify_guard::{classify_command, tokenize};

fuzz_target!(|data: &[u8]| {
    let Ok(command) = std::str::from_utf8(data) else {
        return;
    };

    let verdict = classify_command(command);
    assert!(!verdict.is_fail_open(), "classifier faulted on {command:?}");
    assert_eq!(verdict, classify_command(command));

    // A block always points at a real token
    if let Some(detection) = verdict.detection.as_ref() {
        let tokens = tokenize(command);
        assert_eq!(tokens[detection.flag_index].text, detection.flag);
    }
});
