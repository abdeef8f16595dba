use std::path::Path;

use miette::IntoDiagnostic;
use tracez_engine::{EngineError, VerificationEngine};

use crate::cli::OutputFormat;
use crate::commands::{read_input, unknown_task};

pub(crate) fn run(
    engine: &VerificationEngine,
    task: &str,
    target_line: Option<u32>,
    completion: Option<&Path>,
    format: OutputFormat,
) -> miette::Result<()> {
    let text = read_input(completion)?;
    let outcome = engine
        .verify(&text, task, target_line)
        .map_err(|EngineError::UnknownTask(name)| unknown_task(engine, &name))?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&outcome).into_diagnostic()?
        ),
        OutputFormat::Text => println!("{outcome}"),
    }
    Ok(())
}
