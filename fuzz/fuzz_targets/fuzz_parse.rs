#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Malformed completions are errors, never panics.
        if let Ok(trace) = tracez_grammar::parse_trace_block(s) {
            let again = tracez_grammar::parse_trace_block(&trace.render());
            assert_eq!(again.ok(), Some(trace));
        }
    }
});
