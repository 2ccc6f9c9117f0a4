//! Fuzz target for hook request parsing.
//!
//! Arbitrary bytes on stdin must either fail to parse or yield a request the
//! classifier can handle.

#![no_main]

use libfuzzer_sys::fuzz_target;

use no_verify_guard::classify;
use no_verify_guard::hook::read_hook_input_from;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = read_hook_input_from(data, 64 * 1024) {
        let request = input.into_request();
        let verdict = classify(&request);
        if !request.is_shell() {
            assert!(verdict.is_allowed());
        }
    }
});
