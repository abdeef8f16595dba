//! Coverage report produced by an instrumented run.
//!
//! Uses the `coverage json` layout; only the executed-lines list of one file
//! entry is read:
//!
//! ```json
//! {"files": {"control_temp.py": {"executed_lines": [1, 2, 10]}}}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{ExecutedLines, ExecutionFailure};

#[derive(Debug, Deserialize)]
struct CoverageReport {
    files: BTreeMap<String, FileCoverage>,
}

#[derive(Debug, Deserialize)]
struct FileCoverage {
    executed_lines: Vec<u32>,
}

/// Executed lines recorded for `file_key`.
pub fn parse_report(raw: &str, file_key: &str) -> Result<ExecutedLines, ExecutionFailure> {
    let report: CoverageReport =
        serde_json::from_str(raw).map_err(|e| ExecutionFailure::ReportInvalid(e.to_string()))?;
    report
        .files
        .get(file_key)
        .map(|file| file.executed_lines.iter().copied().collect())
        .ok_or_else(|| ExecutionFailure::ReportInvalid(format!("no entry for `{file_key}`")))
}

pub fn read_report(path: &Path, file_key: &str) -> Result<ExecutedLines, ExecutionFailure> {
    if !path.is_file() {
        return Err(ExecutionFailure::ReportMissing(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ExecutionFailure::ReportInvalid(format!("{}: {e}", path.display())))?;
    parse_report(&raw, file_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_executed_lines_of_named_file() {
        let raw = r#"{
            "meta": {"version": "7.4"},
            "files": {
                "xor.py": {"executed_lines": [1, 5, 7, 9, 10], "missing_lines": [6]},
                "other.py": {"executed_lines": [2]}
            }
        }"#;
        let lines = parse_report(raw, "xor.py").unwrap();
        assert_eq!(lines.into_iter().collect::<Vec<_>>(), vec![1, 5, 7, 9, 10]);
    }

    #[test]
    fn missing_file_key_is_invalid() {
        let err = parse_report(r#"{"files": {}}"#, "xor.py").unwrap_err();
        assert!(matches!(err, ExecutionFailure::ReportInvalid(ref m) if m.contains("xor.py")));
    }

    #[test]
    fn malformed_json_is_invalid() {
        for raw in ["not json", r#"{"files": {"a": {"executed_lines": ["x"]}}}"#, "{}"] {
            assert!(matches!(
                parse_report(raw, "a"),
                Err(ExecutionFailure::ReportInvalid(_))
            ));
        }
    }

    #[test]
    fn absent_report_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        assert!(matches!(
            read_report(&path, "a"),
            Err(ExecutionFailure::ReportMissing(p)) if p == path
        ));
    }
}
