use miette::Diagnostic;
use thiserror::Error;

/// Why a model completion could not be turned into a trace.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum TraceParseError {
    #[error("missing ```trace block")]
    #[diagnostic(
        code(tracez::trace::missing_block),
        help("wrap the answer in a single ```trace fenced block")
    )]
    MissingBlock,

    #[error("empty trace block")]
    #[diagnostic(code(tracez::trace::empty_block))]
    EmptyBlock,

    #[error("first line must be an answer declaration")]
    #[diagnostic(
        code(tracez::trace::missing_answer),
        help("start the block with `answer: reachable` or `answer: unreachable`")
    )]
    MissingAnswer,

    #[error("invalid answer token: {0}")]
    #[diagnostic(
        code(tracez::trace::invalid_answer),
        help("the answer must be `reachable` or `unreachable`")
    )]
    InvalidAnswer(String),

    #[error("invalid trace line: {text}")]
    #[diagnostic(
        code(tracez::trace::invalid_step),
        help("each step is `<line-number> <T|F>`")
    )]
    InvalidStep {
        /// 1-based position among the non-empty lines of the block.
        position: usize,
        text: String,
    },

    #[error("invalid line number: {0}")]
    #[diagnostic(code(tracez::trace::invalid_line_number))]
    InvalidLineNumber(String),

    #[error("branch token must be T or F: {0}")]
    #[diagnostic(code(tracez::trace::invalid_direction))]
    InvalidDirection(String),
}
