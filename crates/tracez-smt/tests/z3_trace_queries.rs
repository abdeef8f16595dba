//! Trace queries over the built-in tasks, solved with Z3.

use tracez_grammar::Decision;
use tracez_ir::builtin;
use tracez_smt::backends::z3_backend::Z3Solver;
use tracez_smt::encoder::encode_trace_query;
use tracez_smt::solver::{SatResult, SmtSolver};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn xor_equal_path_yields_zero_witness() -> TestResult {
    let task = builtin::xor();
    let query = encode_trace_query(
        &task,
        &[Decision::not_taken(5), Decision::taken(7), Decision::taken(10)],
    )?;
    let mut solver = Z3Solver::new();
    query.load(&mut solver)?;
    query.enforce_decisions(&mut solver)?;
    let (result, model) = solver.check_sat_with_model(&query.model_vars())?;
    assert_eq!(result, SatResult::Sat);
    let model = model.ok_or("expected a model")?;
    assert_eq!(model.get_int("a"), Some(0));
    assert_eq!(model.get_int("b"), Some(0));
    Ok(())
}

#[test]
fn guards_are_inert_until_assumed() -> TestResult {
    let task = builtin::xor();
    // Contradicts the goal, but only once the literal is enforced.
    let query = encode_trace_query(&task, &[Decision::not_taken(10)])?;
    let mut solver = Z3Solver::new();
    query.load(&mut solver)?;
    assert_eq!(solver.check_sat_assuming(&[])?, SatResult::Sat);
    assert_eq!(
        solver.check_sat_assuming(&query.assumptions())?,
        SatResult::Unsat
    );
    Ok(())
}

#[test]
fn unsat_core_points_at_conflicting_lines() -> TestResult {
    let task = builtin::control_temp();
    // temp > 30 and a comfortable temperature cannot both hold.
    let query = encode_trace_query(
        &task,
        &[
            Decision::taken(15),
            Decision::not_taken(42),
            Decision::taken(35),
        ],
    )?;
    let mut solver = Z3Solver::new();
    query.load(&mut solver)?;
    assert_eq!(
        solver.check_sat_assuming(&query.assumptions())?,
        SatResult::Unsat
    );
    let mut lines: Vec<u32> = solver
        .unsat_core()?
        .iter()
        .filter_map(|lit| query.line_of(lit))
        .collect();
    lines.sort_unstable();
    assert!(lines.contains(&15), "core lines {lines:?}");
    assert!(lines.contains(&35), "core lines {lines:?}");
    Ok(())
}

#[test]
fn dummy_fall_through_leaves_value_constrained() -> TestResult {
    let task = builtin::dummy();
    let query = encode_trace_query(&task, &[Decision::not_taken(3), Decision::not_taken(5)])?;
    let mut solver = Z3Solver::new();
    query.load(&mut solver)?;
    query.enforce_decisions(&mut solver)?;
    let (result, model) = solver.check_sat_with_model(&query.model_vars())?;
    assert_eq!(result, SatResult::Sat);
    let value = model.ok_or("expected a model")?.get_int("value");
    assert!(!matches!(value, Some(1) | Some(2)), "{value:?}");
    Ok(())
}
