use std::fmt;

use serde::Serialize;
use tracez_grammar::CandidateTrace;
use tracez_ir::Assignment;

use crate::oracle::BranchTruth;

/// Terminal state of one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Feasibility was established; the reward reflects the concrete run.
    Sat,
    Failed,
}

/// Why a verification did not reach the scoring step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ParseError,
    PredictedUnreachable,
    UnknownBranchSite,
    UnsupportedTarget,
    Infeasible,
    ExecutionFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ParseError => "parse_error",
            FailureKind::PredictedUnreachable => "predicted_unreachable",
            FailureKind::UnknownBranchSite => "unknown_branch_site",
            FailureKind::UnsupportedTarget => "unsupported_target",
            FailureKind::Infeasible => "infeasible",
            FailureKind::ExecutionFailure => "execution_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete input recovered from a satisfiable feasibility query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Witness {
    pub values: Assignment,
    /// Variables the model left unconstrained and that took their fallback.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
    /// Decision lines (or `goal`) the witness failed to satisfy on
    /// re-evaluation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<String>,
}

/// Result of verifying one candidate trace against one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    pub satisfiable: bool,
    pub reward: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub parsed_trace: Option<CandidateTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_truth: Option<BranchTruth>,
    /// Decision lines in the unsat core of an infeasible trace.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicting_lines: Vec<u32>,
}

impl VerificationOutcome {
    /// Terminal failure before feasibility was established.
    pub fn failed(
        kind: FailureKind,
        reward: f64,
        reason: impl Into<String>,
        parsed_trace: Option<CandidateTrace>,
    ) -> Self {
        Self {
            status: VerificationStatus::Failed,
            satisfiable: false,
            reward,
            reason: reason.into(),
            failure: Some(kind),
            parsed_trace,
            witness: None,
            actual_truth: None,
            conflicting_lines: Vec::new(),
        }
    }

    /// Feasible trace whose concrete run could not be observed.
    pub fn execution_failed(
        reward: f64,
        reason: impl Into<String>,
        parsed_trace: CandidateTrace,
        witness: Witness,
    ) -> Self {
        Self {
            status: VerificationStatus::Sat,
            satisfiable: true,
            reward,
            reason: reason.into(),
            failure: Some(FailureKind::ExecutionFailure),
            parsed_trace: Some(parsed_trace),
            witness: Some(witness),
            actual_truth: None,
            conflicting_lines: Vec::new(),
        }
    }

    pub fn scored(
        reward: f64,
        parsed_trace: CandidateTrace,
        witness: Witness,
        actual_truth: BranchTruth,
    ) -> Self {
        Self {
            status: VerificationStatus::Sat,
            satisfiable: true,
            reward,
            reason: "ok".into(),
            failure: None,
            parsed_trace: Some(parsed_trace),
            witness: Some(witness),
            actual_truth: Some(actual_truth),
            conflicting_lines: Vec::new(),
        }
    }

    pub fn with_conflicting_lines(mut self, lines: Vec<u32>) -> Self {
        self.conflicting_lines = lines;
        self
    }

    pub fn is_scored(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            VerificationStatus::Sat => writeln!(f, "RESULT: SAT")?,
            VerificationStatus::Failed => writeln!(f, "RESULT: FAILED")?,
        }
        writeln!(f, "Reward: {:.4}", self.reward)?;
        write!(f, "Reason: {}", self.reason)?;
        if let Some(witness) = &self.witness {
            let values: Vec<String> = witness
                .values
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            write!(f, "\nWitness: {}", values.join(", "))?;
            if !witness.fallbacks.is_empty() {
                write!(f, " (fallback: {})", witness.fallbacks.join(", "))?;
            }
        }
        if let Some(truth) = &self.actual_truth {
            let observed: Vec<String> = truth
                .iter()
                .map(|(line, taken)| format!("{line} {}", if *taken { 'T' } else { 'F' }))
                .collect();
            write!(f, "\nObserved: {}", observed.join(", "))?;
        }
        if !self.conflicting_lines.is_empty() {
            let lines: Vec<String> = self.conflicting_lines.iter().map(u32::to_string).collect();
            write!(f, "\nConflicting decisions at lines: {}", lines.join(", "))?;
        }
        Ok(())
    }
}
