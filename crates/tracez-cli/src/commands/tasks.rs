use miette::IntoDiagnostic;
use serde_json::json;
use tracez_engine::VerificationEngine;

use crate::cli::OutputFormat;

pub(crate) fn run(engine: &VerificationEngine, format: OutputFormat) -> miette::Result<()> {
    let registry = engine.registry();
    match format {
        OutputFormat::Text => {
            for task in registry.iter() {
                println!(
                    "{:<14} {:<18} target {:>3}  {} branch sites",
                    task.name,
                    task.file_name,
                    task.target_line,
                    task.branch_sites.len()
                );
            }
        }
        OutputFormat::Json => {
            let tasks: Vec<_> = registry
                .iter()
                .map(|task| {
                    json!({
                        "name": task.name,
                        "file_name": task.file_name,
                        "target_line": task.target_line,
                        "branch_sites": task.branch_sites.keys().collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tasks).into_diagnostic()?);
        }
    }
    Ok(())
}
