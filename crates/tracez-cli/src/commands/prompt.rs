use miette::IntoDiagnostic;
use tracez_engine::VerificationEngine;

use crate::cli::OutputFormat;
use crate::commands::unknown_task;
use crate::prompt::{conversation, user_prompt, TRACE_SYSTEM_PROMPT};

pub(crate) fn run(
    engine: &VerificationEngine,
    task: &str,
    format: OutputFormat,
) -> miette::Result<()> {
    let model = engine
        .registry()
        .get(task)
        .ok_or_else(|| unknown_task(engine, task))?;
    match format {
        OutputFormat::Text => {
            println!("{TRACE_SYSTEM_PROMPT}\n\n---\n\n{}", user_prompt(&model));
        }
        OutputFormat::Json => {
            let messages = conversation(&model);
            println!(
                "{}",
                serde_json::to_string_pretty(&messages).into_diagnostic()?
            );
        }
    }
    Ok(())
}
