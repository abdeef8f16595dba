use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracez_grammar::{parse_trace_block, Answer, CandidateTrace};
use tracez_ir::TaskModel;
use tracing::{info, warn};

use crate::feasibility::{self, FeasibilityFailure};
use crate::oracle;
use crate::registry::TaskRegistry;
use crate::result::{FailureKind, VerificationOutcome};
use crate::reward::{self, MIN_REWARD, PARSE_FAILURE_REWARD};

/// The only error that escapes verification: a caller asked for a task that
/// was never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown task `{0}`")]
    UnknownTask(String),
}

/// Options for the verification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Per-query solver budget; `0` is unbounded.
    pub solver_timeout_secs: u64,
    /// Budget for the whole instrumented run; `0` is unbounded.
    pub execution_timeout_secs: u64,
    /// Directory receiving an SMT-LIB2 dump of every feasibility query.
    pub dump_smt: Option<PathBuf>,
    /// Explain infeasible traces by the decision lines in the unsat core.
    pub diagnose_unsat_core: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            solver_timeout_secs: 30,
            execution_timeout_secs: 10,
            dump_smt: None,
            diagnose_unsat_core: true,
        }
    }
}

/// One item of a batch: a completion to score against a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub task: String,
    /// Defaults to the task's own target line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_line: Option<u32>,
    pub completion: String,
}

/// Scores candidate traces against registered tasks.
///
/// Cheap to clone and safe to share across threads; every call is
/// independent.
#[derive(Debug, Clone)]
pub struct VerificationEngine {
    registry: Arc<TaskRegistry>,
    options: EngineOptions,
}

impl VerificationEngine {
    pub fn new(registry: Arc<TaskRegistry>, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    pub fn with_builtin_tasks(options: EngineOptions) -> Self {
        Self::new(Arc::new(TaskRegistry::with_builtin()), options)
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Score `completion` against the task named `task`.
    ///
    /// `target_line` defaults to the task's target.
    pub fn verify(
        &self,
        completion: &str,
        task: &str,
        target_line: Option<u32>,
    ) -> Result<VerificationOutcome, EngineError> {
        let model = self
            .registry
            .get(task)
            .ok_or_else(|| EngineError::UnknownTask(task.to_string()))?;
        let target_line = target_line.unwrap_or(model.target_line);
        Ok(self.verify_task(&model, completion, target_line))
    }

    /// Score raw model output. Never fails: every problem with the
    /// completion is folded into the outcome.
    pub fn verify_task(
        &self,
        task: &TaskModel,
        completion: &str,
        target_line: u32,
    ) -> VerificationOutcome {
        let started = Instant::now();
        let trace = match parse_trace_block(completion) {
            Ok(trace) => trace,
            Err(e) => {
                info!(task = %task.name, error = %e, "completion did not parse");
                return VerificationOutcome::failed(
                    FailureKind::ParseError,
                    PARSE_FAILURE_REWARD,
                    format!("parse error: {e}"),
                    None,
                );
            }
        };
        info!(
            task = %task.name,
            answer = %trace.answer,
            decisions = trace.decisions.len(),
            "parsed candidate trace"
        );
        let outcome = self.verify_trace(task, trace, target_line);
        info!(
            task = %task.name,
            reward = outcome.reward,
            reason = %outcome.reason,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verification finished"
        );
        outcome
    }

    /// Score an already parsed trace.
    pub fn verify_trace(
        &self,
        task: &TaskModel,
        trace: CandidateTrace,
        target_line: u32,
    ) -> VerificationOutcome {
        if trace.answer == Answer::Unreachable {
            // No oracle certifies unreachability, so the claim is a miss.
            return VerificationOutcome::failed(
                FailureKind::PredictedUnreachable,
                MIN_REWARD,
                "model predicted unreachable",
                Some(trace),
            );
        }

        let feasible = match feasibility::check(task, &trace.decisions, target_line, &self.options)
        {
            Ok(feasible) => feasible,
            Err(failure) => {
                let kind = failure.kind();
                let (reason, lines) = match failure {
                    FeasibilityFailure::Infeasible {
                        reason,
                        conflicting_lines,
                    } => (reason, conflicting_lines),
                    other => (other.to_string(), Vec::new()),
                };
                return VerificationOutcome::failed(kind, MIN_REWARD, reason, Some(trace))
                    .with_conflicting_lines(lines);
            }
        };

        let witness = feasible.witness;
        match oracle::execute(task, &witness.values, self.options.execution_timeout_secs) {
            Ok(truth) => {
                let reward = reward::score(&trace.decisions, &truth);
                VerificationOutcome::scored(reward, trace, witness, truth)
            }
            Err(e) => {
                warn!(task = %task.name, error = %e, "instrumented run failed");
                let reason = if e.is_report_failure() {
                    format!("coverage report unavailable: {e}")
                } else {
                    format!("execution failed: {e}")
                };
                VerificationOutcome::execution_failed(MIN_REWARD, reason, trace, witness)
            }
        }
    }

    /// Score every request in order. A failing request never stops the
    /// batch; unknown tasks come back as errors in their slot.
    pub fn verify_batch(
        &self,
        requests: &[VerificationRequest],
    ) -> Vec<Result<VerificationOutcome, EngineError>> {
        requests
            .iter()
            .map(|req| self.verify(&req.completion, &req.task, req.target_line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::VerificationStatus;

    fn engine() -> VerificationEngine {
        VerificationEngine::with_builtin_tasks(EngineOptions::default())
    }

    #[test]
    fn unknown_task_is_a_caller_error() {
        assert_eq!(
            engine().verify("", "nope", None),
            Err(EngineError::UnknownTask("nope".into()))
        );
    }

    #[test]
    fn parse_failure_has_no_trace() {
        let outcome = engine().verify("no fence here", "xor", None).unwrap();
        assert_eq!(outcome.status, VerificationStatus::Failed);
        assert_eq!(outcome.reward, PARSE_FAILURE_REWARD);
        assert!(outcome.reason.starts_with("parse error: "));
        assert!(outcome.parsed_trace.is_none());
    }

    #[test]
    fn unreachable_is_a_flat_miss() {
        let completion = CandidateTrace::unreachable().render();
        let outcome = engine().verify(&completion, "dummy", None).unwrap();
        assert_eq!(outcome.failure, Some(FailureKind::PredictedUnreachable));
        assert_eq!(outcome.reward, MIN_REWARD);
        assert!(!outcome.satisfiable);
    }

    #[test]
    fn explicit_target_line_is_honoured() {
        let completion = CandidateTrace::reachable(vec![]).render();
        let outcome = engine().verify(&completion, "xor", Some(6)).unwrap();
        assert_eq!(outcome.failure, Some(FailureKind::UnsupportedTarget));
        assert_eq!(outcome.reason, "unsupported target line 6");
    }

    #[test]
    fn default_options_bound_both_steps() {
        let options = EngineOptions::default();
        assert_eq!(options.solver_timeout_secs, 30);
        assert_eq!(options.execution_timeout_secs, 10);
        assert!(options.diagnose_unsat_core);
        assert!(options.dump_smt.is_none());
    }
}
