//! Subcommand implementations.

pub(crate) mod batch;
pub(crate) mod prompt;
pub(crate) mod tasks;
pub(crate) mod verify;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use miette::IntoDiagnostic;
use tracez_engine::{TaskRegistry, VerificationEngine};

use crate::cli::Cli;

/// Built-in tasks plus any definitions under `--tasks-dir`.
pub(crate) fn build_engine(cli: &Cli) -> miette::Result<VerificationEngine> {
    let mut registry = TaskRegistry::with_builtin();
    if let Some(dir) = &cli.tasks_dir {
        registry.load_dir(dir).into_diagnostic()?;
    }
    Ok(VerificationEngine::new(
        Arc::new(registry),
        cli.engine_options(),
    ))
}

/// Contents of `path`, or stdin for `None` / `-`.
pub(crate) fn read_input(path: Option<&Path>) -> miette::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .map_err(|e| miette::miette!("failed to read {}: {e}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .into_diagnostic()?;
            Ok(buf)
        }
    }
}

pub(crate) fn unknown_task(engine: &VerificationEngine, name: &str) -> miette::Report {
    miette::miette!(
        help = format!("registered tasks: {}", engine.registry().names().join(", ")),
        "unknown task `{name}`"
    )
}
