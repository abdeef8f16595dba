#![doc = include_str!("../README.md")]

//! Trace grammar and parser.
//!
//! Turns raw model output into a [`CandidateTrace`]: an answer plus the
//! ordered list of branch decisions it claims.

pub mod ast;
pub mod errors;
pub mod parser;

pub use ast::{Answer, CandidateTrace, Decision, Direction};
pub use errors::TraceParseError;
pub use parser::{parse_trace_block, REASONING_DELIMITER};
