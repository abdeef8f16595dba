//! External instrumented execution.
//!
//! Every call either runs in a fresh temporary directory, so concurrent calls
//! never share a report file, or, when the task pins a shared working
//! directory, holds that directory's lock across "clear report, run, read
//! report".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use tracez_ir::template::{segments, Segment};
use tracez_ir::{Assignment, CommandSpec, CommandStep};
use tracing::{debug, info};
use wait_timeout::ChildExt;

use super::report::read_report;
use super::{ExecutedLines, ExecutionFailure};
use crate::timeout::{deadline_exceeded, deadline_from_timeout_secs, remaining};

static SHARED_DIR_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn shared_dir_lock(dir: &Path) -> Arc<Mutex<()>> {
    let locks = SHARED_DIR_LOCKS.get_or_init(Default::default);
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(dir.to_path_buf()).or_default().clone()
}

pub fn run(
    task: &str,
    spec: &CommandSpec,
    witness: &Assignment,
    timeout_secs: u64,
) -> Result<ExecutedLines, ExecutionFailure> {
    match &spec.shared_workdir {
        Some(dir) => {
            let lock = shared_dir_lock(dir);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            std::fs::create_dir_all(dir).map_err(ExecutionFailure::Workspace)?;
            debug!(task, workdir = %dir.display(), "running in shared directory");
            run_in(dir, spec, witness, timeout_secs, true)
        }
        None => {
            let scratch = tempfile::Builder::new()
                .prefix(&format!("tracez-{task}-"))
                .tempdir()
                .map_err(ExecutionFailure::Workspace)?;
            debug!(task, workdir = %scratch.path().display(), "running in scratch directory");
            run_in(scratch.path(), spec, witness, timeout_secs, false)
        }
    }
}

fn run_in(
    workdir: &Path,
    spec: &CommandSpec,
    witness: &Assignment,
    timeout_secs: u64,
    clear_stale_report: bool,
) -> Result<ExecutedLines, ExecutionFailure> {
    let ctx = RenderContext {
        witness,
        workdir,
        report: &workdir.join(render(&spec.report.path, &RenderContext::bare(witness, workdir))?),
    };

    if clear_stale_report {
        match std::fs::remove_file(ctx.report) {
            Ok(()) => debug!(report = %ctx.report.display(), "removed stale report"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExecutionFailure::Workspace(e)),
        }
    }

    let deadline = deadline_from_timeout_secs(timeout_secs);
    for step in &spec.steps {
        if deadline_exceeded(deadline) {
            return Err(ExecutionFailure::Timeout {
                program: step.program.clone(),
                secs: timeout_secs,
            });
        }
        run_step(step, spec, &ctx, deadline, timeout_secs)?;
    }
    read_report(ctx.report, &spec.report.file_key)
}

fn run_step(
    step: &CommandStep,
    spec: &CommandSpec,
    ctx: &RenderContext<'_>,
    deadline: Option<Instant>,
    timeout_secs: u64,
) -> Result<(), ExecutionFailure> {
    let program = render(&step.program, ctx)?;
    let args = step
        .args
        .iter()
        .map(|arg| render(arg, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let mut envs = Vec::with_capacity(spec.env.len());
    for (key, value) in &spec.env {
        envs.push((key.as_str(), render(value, ctx)?));
    }

    let started = Instant::now();
    let mut child = Command::new(&program)
        .args(&args)
        .envs(envs)
        .current_dir(ctx.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ExecutionFailure::Spawn {
            program: program.clone(),
            source,
        })?;

    let wait_failed = |source| ExecutionFailure::Wait {
        program: program.clone(),
        source,
    };
    let status = match remaining(deadline) {
        None => child.wait().map_err(wait_failed)?,
        Some(left) => match child.wait_timeout(left).map_err(wait_failed)? {
            Some(status) => status,
            None => {
                // Reap the killed child so it does not linger as a zombie.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecutionFailure::Timeout {
                    program,
                    secs: timeout_secs,
                });
            }
        },
    };

    info!(
        program = %program,
        args = ?args,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "instrumented step finished"
    );
    if status.success() {
        Ok(())
    } else {
        Err(ExecutionFailure::NonZeroExit {
            program,
            status: status.to_string(),
        })
    }
}

struct RenderContext<'a> {
    witness: &'a Assignment,
    workdir: &'a Path,
    report: &'a Path,
}

impl<'a> RenderContext<'a> {
    /// Context for rendering the report path itself, where `{report}` is
    /// meaningless.
    fn bare(witness: &'a Assignment, workdir: &'a Path) -> Self {
        Self {
            witness,
            workdir,
            report: Path::new(""),
        }
    }
}

fn render(template: &str, ctx: &RenderContext<'_>) -> Result<String, ExecutionFailure> {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Var(name) => {
                let value = ctx
                    .witness
                    .get(name)
                    .ok_or_else(|| ExecutionFailure::MissingValue(name.to_string()))?;
                out.push_str(&value.to_arg());
            }
            Segment::Workdir => out.push_str(&ctx.workdir.to_string_lossy()),
            Segment::Report => out.push_str(&ctx.report.to_string_lossy()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracez_ir::Value;

    #[test]
    fn renders_placeholders() {
        let witness: Assignment = [
            ("mode".to_string(), Value::Int(-3)),
            ("flag".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        let ctx = RenderContext {
            witness: &witness,
            workdir: Path::new("/w"),
            report: Path::new("/w/cov.json"),
        };
        assert_eq!(
            render("--mode={var:mode} {var:flag} {workdir} {report} {{x}}", &ctx).unwrap(),
            "--mode=-3 1 /w /w/cov.json {x}"
        );
        assert!(matches!(
            render("{var:missing}", &ctx),
            Err(ExecutionFailure::MissingValue(_))
        ));
    }

    #[test]
    fn shared_dir_locks_are_per_directory() {
        let a = shared_dir_lock(Path::new("/tmp/tracez-lock-a"));
        let a_again = shared_dir_lock(Path::new("/tmp/tracez-lock-a"));
        let b = shared_dir_lock(Path::new("/tmp/tracez-lock-b"));
        assert!(Arc::ptr_eq(&a, &a_again));
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
