use std::fmt;

use serde::{Deserialize, Serialize};

/// The reachability verdict a trace declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Reachable,
    Unreachable,
}

impl Answer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Reachable => "reachable",
            Answer::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a branch decision, rendered as `T` / `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "T")]
    Taken,
    #[serde(rename = "F")]
    NotTaken,
}

impl Direction {
    pub fn from_bool(taken: bool) -> Self {
        if taken {
            Direction::Taken
        } else {
            Direction::NotTaken
        }
    }

    /// `true` for [`Direction::Taken`].
    pub fn is_taken(self) -> bool {
        matches!(self, Direction::Taken)
    }

    pub fn token(self) -> char {
        match self {
            Direction::Taken => 'T',
            Direction::NotTaken => 'F',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One claimed branch decision: the branch at `line` went `direction`.
///
/// `line` is whatever integer the trace wrote. Whether it names a branch
/// site is decided against a task, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub line: i64,
    pub direction: Direction,
}

impl Decision {
    pub fn new(line: i64, direction: Direction) -> Self {
        Self { line, direction }
    }

    pub fn taken(line: i64) -> Self {
        Self::new(line, Direction::Taken)
    }

    pub fn not_taken(line: i64) -> Self {
        Self::new(line, Direction::NotTaken)
    }

    /// The listing line this decision names, `None` if no listing line can
    /// have that number.
    pub fn listing_line(&self) -> Option<u32> {
        u32::try_from(self.line).ok()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.line, self.direction)
    }
}

/// A parsed trace submitted for scoring.
///
/// Decision order is kept as written. Feasibility encoding treats the
/// decisions as an unordered conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub answer: Answer,
    pub decisions: Vec<Decision>,
}

impl CandidateTrace {
    pub fn reachable(decisions: Vec<Decision>) -> Self {
        Self {
            answer: Answer::Reachable,
            decisions,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            answer: Answer::Unreachable,
            decisions: Vec::new(),
        }
    }

    /// Render the trace back into its fenced text form.
    pub fn render(&self) -> String {
        let mut out = String::from("```trace\n");
        out.push_str(&format!("answer: {}\n", self.answer));
        for decision in &self.decisions {
            out.push_str(&format!("{decision}\n"));
        }
        out.push_str("```");
        out
    }
}
