//! Feasibility of a candidate trace: is there any input that follows every
//! claimed branch direction and still reaches the target?

use std::fmt::Display;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracez_grammar::Decision;
use tracez_ir::{eval_bool, Assignment, Sort, TaskModel, Value};
use tracez_smt::backends::z3_backend::Z3Solver;
use tracez_smt::encoder::{encode_trace_query, EncodeError, TraceQuery};
use tracez_smt::solver::{Model, SatResult, SmtSolver};
use tracing::{debug, info, warn};

use crate::pipeline::EngineOptions;
use crate::result::{FailureKind, Witness};

static DUMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeasibilityFailure {
    #[error("unsupported target line {0}")]
    UnsupportedTarget(u32),
    #[error("line {0} is not a branch site")]
    UnknownBranchSite(i64),
    #[error("{reason}")]
    Infeasible {
        reason: String,
        /// Decision lines in the unsat core, when diagnosed.
        conflicting_lines: Vec<u32>,
    },
}

impl FeasibilityFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            FeasibilityFailure::UnsupportedTarget(_) => FailureKind::UnsupportedTarget,
            FeasibilityFailure::UnknownBranchSite(_) => FailureKind::UnknownBranchSite,
            FeasibilityFailure::Infeasible { .. } => FailureKind::Infeasible,
        }
    }

    fn infeasible(reason: impl Into<String>) -> Self {
        FeasibilityFailure::Infeasible {
            reason: reason.into(),
            conflicting_lines: Vec::new(),
        }
    }

    fn solver_error(err: impl Display) -> Self {
        Self::infeasible(format!("solver error: {err}"))
    }
}

impl From<EncodeError> for FeasibilityFailure {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::UnknownBranchSite(line) => FeasibilityFailure::UnknownBranchSite(line),
            other => Self::infeasible(format!("encoding failed: {other}")),
        }
    }
}

/// A satisfiable trace and the concrete input that realises it.
#[derive(Debug, Clone, PartialEq)]
pub struct Feasible {
    pub witness: Witness,
    /// Term count of the query that was checked.
    pub query_size: usize,
}

/// Check `decisions` against `task` for the requested target.
pub fn check(
    task: &TaskModel,
    decisions: &[Decision],
    target_line: u32,
    options: &EngineOptions,
) -> Result<Feasible, FeasibilityFailure> {
    if !task.supports_target(target_line) {
        return Err(FeasibilityFailure::UnsupportedTarget(target_line));
    }

    let query = encode_trace_query(task, decisions)?;
    let query_size = query.size();
    info!(
        task = %task.name,
        decisions = decisions.len(),
        query_size,
        "feasibility query encoded"
    );
    if let Some(dir) = &options.dump_smt {
        dump_query(dir, &task.name, &query);
    }

    let mut solver = Z3Solver::with_timeout_secs(options.solver_timeout_secs);
    let model = solve(&mut solver, &query, options.diagnose_unsat_core)?;
    let witness = build_witness(task, decisions, &model);
    info!(
        task = %task.name,
        witness = ?witness.values,
        fallbacks = ?witness.fallbacks,
        "trace is feasible"
    );
    Ok(Feasible {
        witness,
        query_size,
    })
}

/// Run the query on `solver` and return its model.
///
/// With `diagnose` set, the decisions are first checked as assumptions so
/// an unsat verdict can name the decision lines involved.
pub fn solve<S: SmtSolver>(
    solver: &mut S,
    query: &TraceQuery,
    diagnose: bool,
) -> Result<Model, FeasibilityFailure> {
    query.load(solver).map_err(FeasibilityFailure::solver_error)?;

    if diagnose && !query.decisions.is_empty() {
        let verdict = solver
            .check_sat_assuming(&query.assumptions())
            .map_err(FeasibilityFailure::solver_error)?;
        match verdict {
            SatResult::Sat => {}
            SatResult::Unsat => {
                let core = solver
                    .unsat_core()
                    .map_err(FeasibilityFailure::solver_error)?;
                let mut lines: Vec<u32> = core.iter().filter_map(|l| query.line_of(l)).collect();
                lines.sort_unstable();
                lines.dedup();
                info!(conflicting = ?lines, "solver verdict: unsat");
                return Err(FeasibilityFailure::Infeasible {
                    reason: "unsatisfiable trace".into(),
                    conflicting_lines: lines,
                });
            }
            SatResult::Unknown(why) => return Err(unknown(&why)),
        }
    }

    query
        .enforce_decisions(solver)
        .map_err(FeasibilityFailure::solver_error)?;
    let (verdict, model) = solver
        .check_sat_with_model(&query.model_vars())
        .map_err(FeasibilityFailure::solver_error)?;
    match verdict {
        SatResult::Sat => {
            debug!("solver verdict: sat");
            model.ok_or_else(|| FeasibilityFailure::infeasible("solver reported sat without a model"))
        }
        SatResult::Unsat => {
            info!("solver verdict: unsat");
            Err(FeasibilityFailure::infeasible("unsatisfiable trace"))
        }
        SatResult::Unknown(why) => Err(unknown(&why)),
    }
}

fn unknown(why: &str) -> FeasibilityFailure {
    warn!(reason = why, "solver verdict: unknown");
    FeasibilityFailure::infeasible(format!("solver returned unknown ({why})"))
}

/// One value per task variable; unconstrained variables take their
/// declared fallback.
fn build_witness(task: &TaskModel, decisions: &[Decision], model: &Model) -> Witness {
    let mut values = Assignment::new();
    let mut fallbacks = Vec::new();
    for var in &task.variables {
        let solved = match var.sort {
            Sort::Int => model.get_int(&var.name).map(Value::Int),
            Sort::Bool => model.get_bool(&var.name).map(Value::Bool),
        };
        let value = solved.unwrap_or_else(|| {
            fallbacks.push(var.name.clone());
            match var.sort {
                Sort::Int => Value::Int(var.fallback_value()),
                Sort::Bool => Value::Bool(var.fallback_value() != 0),
            }
        });
        values.insert(var.name.clone(), value);
    }
    if !fallbacks.is_empty() {
        debug!(task = %task.name, fallbacks = ?fallbacks, "unconstrained variables took fallbacks");
    }

    let mismatches = self_check(task, decisions, &values);
    if !mismatches.is_empty() {
        warn!(
            task = %task.name,
            mismatches = ?mismatches,
            "witness does not satisfy its own query"
        );
    }
    Witness {
        values,
        fallbacks,
        mismatches,
    }
}

/// Re-evaluate every decision and the goal under `values`.
fn self_check(task: &TaskModel, decisions: &[Decision], values: &Assignment) -> Vec<String> {
    let mut mismatches = Vec::new();
    for decision in decisions {
        let Some(site) = decision.listing_line().and_then(|line| task.site(line)) else {
            continue;
        };
        match eval_bool(&site.predicate, values) {
            Ok(taken) if taken == decision.direction.is_taken() => {}
            Ok(_) => mismatches.push(format!("line {}", decision.line)),
            Err(e) => mismatches.push(format!("line {}: {e}", decision.line)),
        }
    }
    match eval_bool(&task.reachability_goal, values) {
        Ok(true) => {}
        Ok(false) => mismatches.push("goal".into()),
        Err(e) => mismatches.push(format!("goal: {e}")),
    }
    mismatches
}

fn dump_query(dir: &Path, task: &str, query: &TraceQuery) {
    let n = DUMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!("{task}_{}_{n}.smt2", std::process::id()));
    let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, query.to_smt2()));
    match written {
        Ok(()) => debug!(path = %path.display(), "wrote SMT query"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write SMT query"),
    }
}
