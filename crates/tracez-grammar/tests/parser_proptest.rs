//! Property-based tests for the trace parser.

use proptest::prelude::*;
use tracez_grammar::{parse_trace_block, Answer, TraceParseError};

proptest! {
    #[test]
    fn arbitrary_text_never_panics(raw in ".{0,256}") {
        let _ = parse_trace_block(&raw);
    }

    #[test]
    fn text_without_fence_is_missing_block(raw in "[^`]{0,200}") {
        prop_assert_eq!(parse_trace_block(&raw), Err(TraceParseError::MissingBlock));
    }

    #[test]
    fn three_token_steps_are_rejected(line in 1u32..500, extra in "[a-z]{1,8}") {
        let raw = format!("```trace\nanswer: reachable\n{line} T {extra}\n```");
        let is_invalid_step = matches!(
            parse_trace_block(&raw),
            Err(TraceParseError::InvalidStep { .. })
        );
        prop_assert!(is_invalid_step);
    }

    #[test]
    fn decisions_keep_written_order(lines in prop::collection::vec((-50i64..200, any::<bool>()), 0..12)) {
        let mut raw = String::from("```trace\nanswer: reachable\n");
        for (line, taken) in &lines {
            raw.push_str(&format!("{line} {}\n", if *taken { "t" } else { "F" }));
        }
        raw.push_str("```");
        let trace = parse_trace_block(&raw).expect("well-formed trace should parse");
        prop_assert_eq!(trace.answer, Answer::Reachable);
        let parsed: Vec<(i64, bool)> = trace
            .decisions
            .iter()
            .map(|d| (d.line, d.direction.is_taken()))
            .collect();
        prop_assert_eq!(parsed, lines);
    }
}
