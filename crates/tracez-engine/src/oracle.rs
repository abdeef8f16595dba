//! Ground-truth oracle: run a witness through the task's instrumented
//! program and read back which way every reached branch went.

pub mod command;
pub mod native;
pub mod report;

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracez_ir::template::TemplateError;
use tracez_ir::{Assignment, RunnerSpec, TaskModel};
use tracing::{debug, info};

/// Actual outcome per reached branch site. Sites whose probe never executed
/// are absent.
pub type BranchTruth = BTreeMap<u32, bool>;

/// Listing locations executed by one instrumented run.
pub type ExecutedLines = BTreeSet<u32>;

#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}")]
    NonZeroExit { program: String, status: String },
    #[error("`{program}` timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("coverage report missing: {}", .0.display())]
    ReportMissing(PathBuf),
    #[error("failed to parse coverage: {0}")]
    ReportInvalid(String),
    #[error("scratch directory unavailable: {0}")]
    Workspace(#[source] io::Error),
    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("command template: {0}")]
    Template(#[from] TemplateError),
    #[error("no built-in program named `{0}`")]
    UnknownProgram(String),
    #[error("witness has no integer value for `{0}`")]
    MissingValue(String),
}

impl ExecutionFailure {
    /// True when the run itself completed and only its report was unusable.
    pub fn is_report_failure(&self) -> bool {
        matches!(
            self,
            ExecutionFailure::ReportMissing(_) | ExecutionFailure::ReportInvalid(_)
        )
    }
}

/// Actual branch outcomes given the executed locations.
///
/// A site is reported only if its probe location executed; it is taken iff
/// any of its evidence locations executed.
pub fn branch_truth(task: &TaskModel, executed: &ExecutedLines) -> BranchTruth {
    task.branch_sites
        .values()
        .filter(|site| executed.contains(&site.probe_location()))
        .map(|site| {
            let taken = site.evidence.iter().any(|line| executed.contains(line));
            (site.id, taken)
        })
        .collect()
}

/// Execute `witness` concretely and derive the branch truth map.
///
/// Blocks until the instrumented run has finished and its report was read.
pub fn execute(
    task: &TaskModel,
    witness: &Assignment,
    execution_timeout_secs: u64,
) -> Result<BranchTruth, ExecutionFailure> {
    let executed = match &task.runner {
        RunnerSpec::Native { program } => native::run(program, witness)?,
        RunnerSpec::Command(spec) => {
            command::run(&task.name, spec, witness, execution_timeout_secs)?
        }
    };
    debug!(task = %task.name, executed = ?executed, "instrumented run finished");
    let truth = branch_truth(task, &executed);
    info!(task = %task.name, reached = truth.len(), "ground truth collected");
    Ok(truth)
}
