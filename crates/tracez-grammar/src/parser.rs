use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Answer, CandidateTrace, Decision, Direction};
use crate::errors::TraceParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct TraceGrammar;

/// Marker closing the model's private reasoning. Only text from the last
/// occurrence onward is parsed.
pub const REASONING_DELIMITER: &str = "[/THINK]";

/// Extract the first ```` ```trace ```` block from `raw_output` and parse it.
pub fn parse_trace_block(raw_output: &str) -> Result<CandidateTrace, TraceParseError> {
    let visible = match raw_output.rfind(REASONING_DELIMITER) {
        Some(idx) => &raw_output[idx..],
        None => raw_output,
    };

    let body = extract_block_body(visible)?;
    let contents: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let (header, steps) = contents
        .split_first()
        .ok_or(TraceParseError::EmptyBlock)?;

    let answer = parse_answer_line(header)?;
    let decisions = steps
        .iter()
        .enumerate()
        .map(|(idx, line)| parse_step_line(line, idx + 2))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CandidateTrace { answer, decisions })
}

fn extract_block_body(text: &str) -> Result<&str, TraceParseError> {
    let pairs =
        TraceGrammar::parse(Rule::document, text).map_err(|_| TraceParseError::MissingBlock)?;
    pairs
        .flatten()
        .find(|pair| pair.as_rule() == Rule::block_body)
        .map(|pair| pair.as_str())
        .ok_or(TraceParseError::MissingBlock)
}

fn parse_answer_line(line: &str) -> Result<Answer, TraceParseError> {
    if let Ok(pairs) = TraceGrammar::parse(Rule::answer_line, line) {
        let value = pairs
            .flatten()
            .find(|pair| pair.as_rule() == Rule::answer_value)
            .map(|pair| pair.as_str().to_ascii_lowercase());
        match value.as_deref() {
            Some("reachable") => return Ok(Answer::Reachable),
            Some("unreachable") => return Ok(Answer::Unreachable),
            _ => {}
        }
    }

    if TraceGrammar::parse(Rule::answer_key, line).is_err() {
        return Err(TraceParseError::MissingAnswer);
    }
    let token = line
        .split_once(':')
        .map(|(_, rest)| rest.trim().to_ascii_lowercase())
        .unwrap_or_default();
    Err(TraceParseError::InvalidAnswer(token))
}

fn parse_step_line(line: &str, position: usize) -> Result<Decision, TraceParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [number, token] = tokens.as_slice() else {
        return Err(TraceParseError::InvalidStep {
            position,
            text: line.to_string(),
        });
    };

    if TraceGrammar::parse(Rule::line_number_token, number).is_err() {
        return Err(TraceParseError::InvalidLineNumber(number.to_string()));
    }
    // Sign and width are the trace's business; only a value outside `i64`
    // is unusable.
    let line_no: i64 = number
        .parse()
        .map_err(|_| TraceParseError::InvalidLineNumber(number.to_string()))?;

    if TraceGrammar::parse(Rule::direction_token, token).is_err() {
        return Err(TraceParseError::InvalidDirection(token.to_string()));
    }
    let direction = Direction::from_bool(token.eq_ignore_ascii_case("t"));

    Ok(Decision::new(line_no, direction))
}
