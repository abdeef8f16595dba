#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(trace) = tracez_grammar::parse_trace_block(s) {
            for task in tracez_ir::builtin::tasks() {
                // Encoding only; no solver call.
                if let Ok(query) = tracez_smt::encoder::encode_trace_query(&task, &trace.decisions) {
                    let _ = query.to_smt2();
                }
            }
        }
    }
});
