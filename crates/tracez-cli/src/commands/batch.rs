use std::path::Path;

use miette::IntoDiagnostic;
use serde_json::json;
use tracez_engine::{VerificationEngine, VerificationRequest};
use tracing::{info, warn};

use crate::commands::read_input;

/// One JSON record per non-blank input line, in input order. Lines that do
/// not deserialize and requests naming unknown tasks become error records.
pub(crate) fn run(engine: &VerificationEngine, input: &Path) -> miette::Result<()> {
    let raw = read_input(Some(input))?;

    let mut requests = Vec::new();
    let mut slots = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        match serde_json::from_str::<VerificationRequest>(line) {
            Ok(request) => {
                slots.push((line_no, Ok(requests.len())));
                requests.push(request);
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "malformed batch request");
                slots.push((line_no, Err(e.to_string())));
            }
        }
    }

    let outcomes = engine.verify_batch(&requests);
    let mut scored = 0usize;
    let mut total_reward = 0.0;
    for (line_no, slot) in slots {
        let record = match slot {
            Err(error) => json!({ "line": line_no, "error": error }),
            Ok(i) => match &outcomes[i] {
                Ok(outcome) => {
                    scored += 1;
                    total_reward += outcome.reward;
                    let outcome = serde_json::to_value(outcome).into_diagnostic()?;
                    json!({ "line": line_no, "task": requests[i].task, "outcome": outcome })
                }
                Err(e) => json!({ "line": line_no, "task": requests[i].task, "error": e.to_string() }),
            },
        };
        println!("{}", serde_json::to_string(&record).into_diagnostic()?);
    }

    let mean = if scored == 0 { 0.0 } else { total_reward / scored as f64 };
    info!(requests = requests.len(), scored, mean_reward = mean, "batch finished");
    Ok(())
}
