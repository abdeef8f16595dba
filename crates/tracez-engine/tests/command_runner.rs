//! External instrumented runs driven through `sh`.
#![cfg(unix)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracez_engine::oracle::{command, ExecutedLines, ExecutionFailure};
use tracez_ir::{Assignment, CommandSpec, CommandStep, ReportSpec, Value};

const WRITE_REPORT: &str =
    r#"printf '{{"files": {{"prog.c": {{"executed_lines": [%s, 9]}}}}}}' "$1" > "$2""#;

fn sh(script: &str, args: &[&str]) -> CommandStep {
    let mut all = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    all.extend(args.iter().map(|a| a.to_string()));
    CommandStep {
        program: "sh".into(),
        args: all,
    }
}

fn spec(steps: Vec<CommandStep>) -> CommandSpec {
    CommandSpec {
        steps,
        report: ReportSpec {
            path: "coverage.json".into(),
            file_key: "prog.c".into(),
        },
        env: BTreeMap::new(),
        shared_workdir: None,
    }
}

fn witness(x: i64) -> Assignment {
    [("x".to_string(), Value::Int(x))].into_iter().collect()
}

fn lines(v: &[u32]) -> ExecutedLines {
    v.iter().copied().collect()
}

#[test]
fn reads_lines_from_report_written_by_command() {
    let spec = spec(vec![sh(WRITE_REPORT, &["{var:x}", "{report}"])]);
    let executed = command::run("t", &spec, &witness(4), 10).unwrap();
    assert_eq!(executed, lines(&[4, 9]));
}

#[test]
fn steps_share_the_working_directory() {
    let spec = spec(vec![
        sh(r#"echo "$1" > value.txt"#, &["{var:x}"]),
        sh(WRITE_REPORT.replace("\"$1\"", "\"$(cat value.txt)\"").as_str(), &["unused", "{report}"]),
    ]);
    let executed = command::run("t", &spec, &witness(12), 10).unwrap();
    assert_eq!(executed, lines(&[9, 12]));
}

#[test]
fn env_values_are_rendered() {
    let mut spec = spec(vec![sh(
        r#"printf '{{"files": {{"prog.c": {{"executed_lines": [%s]}}}}}}' "$X" > "$OUT""#,
        &[],
    )]);
    spec.env.insert("X".into(), "{var:x}".into());
    spec.env.insert("OUT".into(), "{report}".into());
    let executed = command::run("t", &spec, &witness(7), 10).unwrap();
    assert_eq!(executed, lines(&[7]));
}

#[test]
fn non_zero_exit_is_reported() {
    let spec = spec(vec![sh("exit 3", &[])]);
    let err = command::run("t", &spec, &witness(0), 10).unwrap_err();
    assert!(matches!(err, ExecutionFailure::NonZeroExit { ref program, .. } if program == "sh"));
    assert!(!err.is_report_failure());
}

#[test]
fn hung_command_is_killed_at_the_deadline() {
    let spec = spec(vec![sh("sleep 30", &[])]);
    let started = Instant::now();
    let err = command::run("t", &spec, &witness(0), 1).unwrap_err();
    assert!(matches!(err, ExecutionFailure::Timeout { secs: 1, .. }));
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn missing_report_is_distinct_from_crash() {
    let spec = spec(vec![sh("true", &[])]);
    let err = command::run("t", &spec, &witness(0), 10).unwrap_err();
    assert!(matches!(err, ExecutionFailure::ReportMissing(_)));
    assert!(err.is_report_failure());
}

#[test]
fn report_without_file_entry_is_invalid() {
    let spec = spec(vec![sh(r#"echo '{{"files": {{}}}}' > "$1""#, &["{report}"])]);
    let err = command::run("t", &spec, &witness(0), 10).unwrap_err();
    assert!(matches!(err, ExecutionFailure::ReportInvalid(_)));
}

#[test]
fn spawn_failure_names_the_program() {
    let spec = spec(vec![CommandStep {
        program: "/nonexistent/tracez-instrumented".into(),
        args: vec![],
    }]);
    let err = command::run("t", &spec, &witness(0), 10).unwrap_err();
    assert!(
        matches!(err, ExecutionFailure::Spawn { ref program, .. } if program.ends_with("tracez-instrumented"))
    );
}

#[test]
fn shared_workdir_clears_stale_report_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("shared");

    let mut writes = spec(vec![sh(WRITE_REPORT, &["{var:x}", "{report}"])]);
    writes.shared_workdir = Some(shared.clone());
    assert_eq!(
        command::run("t", &writes, &witness(1), 10).unwrap(),
        lines(&[1, 9])
    );
    assert!(shared.join("coverage.json").is_file());

    // A run that writes nothing must not see the previous report.
    let mut silent = spec(vec![sh("true", &[])]);
    silent.shared_workdir = Some(shared.clone());
    let err = command::run("t", &silent, &witness(1), 10).unwrap_err();
    assert!(matches!(err, ExecutionFailure::ReportMissing(p) if p == shared.join("coverage.json")));
}

#[test]
fn concurrent_runs_in_a_shared_workdir_do_not_mix_reports() {
    let dir = tempfile::tempdir().unwrap();
    let shared: PathBuf = dir.path().join("shared");
    let mut spec = spec(vec![sh(
        &format!("sleep 0.1; {WRITE_REPORT}"),
        &["{var:x}", "{report}"],
    )]);
    spec.shared_workdir = Some(shared);

    let handles: Vec<_> = (0..4)
        .map(|x| {
            let spec = spec.clone();
            std::thread::spawn(move || command::run("t", &spec, &witness(x), 10))
        })
        .collect();
    for (x, handle) in handles.into_iter().enumerate() {
        let executed = handle.join().unwrap().unwrap();
        assert_eq!(executed, lines(&[x as u32, 9]));
    }
}

#[test]
fn scratch_directories_are_removed_after_the_run() {
    let spec = spec(vec![sh(r#"pwd > "$1"; false"#, &["{workdir}/../tracez-pwd-probe"])]);
    // The step fails on purpose; only cleanup is under test.
    let _ = command::run("cleanup", &spec, &witness(0), 10);
    let probe = std::env::temp_dir().join("tracez-pwd-probe");
    if let Ok(recorded) = std::fs::read_to_string(&probe) {
        let _ = std::fs::remove_file(&probe);
        assert!(!PathBuf::from(recorded.trim()).exists());
    }
}
