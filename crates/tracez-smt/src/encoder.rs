//! Feasibility query for one candidate trace.
//!
//! The query is the conjunction of
//! - the domain constraints of every task variable,
//! - one constraint per decision: the site predicate if taken, its negation
//!   otherwise,
//! - the task's reachability goal.
//!
//! Decision constraints are guarded by a fresh Boolean literal
//! (`lit => constraint`) so the solver can be run under assumptions and an
//! unsatisfiable trace explained by the decision lines in the unsat core.

use std::fmt::Write as _;

use thiserror::Error;
use tracez_grammar::{Decision, Direction};
use tracez_ir::{Expr, Sort, TaskModel, VariableDecl};

use crate::backends::smtlib_printer::{sort_to_smtlib, symbol, to_smtlib};
use crate::solver::SmtSolver;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

const DECISION_PREFIX: &str = "__decision_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("line {0} is not a branch site")]
    UnknownBranchSite(i64),
    #[error("variable `{0}` uses a reserved solver name")]
    ReservedName(String),
}

/// Assumption literal naming the `index`-th decision.
pub fn decision_literal(index: usize) -> String {
    format!("{DECISION_PREFIX}{index}")
}

/// A decision constraint together with its guard literal.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedDecision {
    pub literal: String,
    pub line: u32,
    pub direction: Direction,
    pub constraint: SmtTerm,
}

/// Declarations and assertions of a trace feasibility query.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceQuery {
    /// Task variables: (name, sort).
    pub declarations: Vec<(String, SmtSort)>,
    /// Unguarded assertions: domain constraints, then the reachability goal.
    pub assertions: Vec<SmtTerm>,
    /// Guarded decision constraints, in trace order.
    pub decisions: Vec<GuardedDecision>,
}

impl TraceQuery {
    /// Variables whose values make up a witness.
    pub fn model_vars(&self) -> Vec<(&str, &SmtSort)> {
        self.declarations
            .iter()
            .map(|(name, sort)| (name.as_str(), sort))
            .collect()
    }

    pub fn assumptions(&self) -> Vec<String> {
        self.decisions.iter().map(|d| d.literal.clone()).collect()
    }

    /// Listing line of the decision guarded by `literal`.
    pub fn line_of(&self, literal: &str) -> Option<u32> {
        self.decisions
            .iter()
            .find(|d| d.literal == literal)
            .map(|d| d.line)
    }

    /// Declare everything and assert the unguarded part plus the guard
    /// implications. Decisions are only enforced once their literals are
    /// assumed or asserted.
    pub fn load<S: SmtSolver>(&self, solver: &mut S) -> Result<(), S::Error> {
        for (name, sort) in &self.declarations {
            solver.declare_var(name, sort)?;
        }
        for decision in &self.decisions {
            solver.declare_var(&decision.literal, &SmtSort::Bool)?;
        }
        for assertion in &self.assertions {
            solver.assert(assertion)?;
        }
        for decision in &self.decisions {
            solver.assert(&guard(decision))?;
        }
        Ok(())
    }

    /// Assert every decision literal as a fact.
    pub fn enforce_decisions<S: SmtSolver>(&self, solver: &mut S) -> Result<(), S::Error> {
        for decision in &self.decisions {
            solver.assert(&SmtTerm::var(decision.literal.clone()))?;
        }
        Ok(())
    }

    /// Total number of term nodes across all assertions.
    pub fn size(&self) -> usize {
        self.assertions.iter().map(SmtTerm::size).sum::<usize>()
            + self
                .decisions
                .iter()
                .map(|d| d.constraint.size() + 2)
                .sum::<usize>()
    }

    /// Standalone SMT-LIB2 script checking the query under its decision
    /// assumptions.
    pub fn to_smt2(&self) -> String {
        let nonlinear = self
            .assertions
            .iter()
            .chain(self.decisions.iter().map(|d| &d.constraint))
            .any(SmtTerm::is_nonlinear);
        let mut smt = String::new();
        let _ = writeln!(smt, "(set-option :produce-unsat-cores true)");
        let _ = writeln!(
            smt,
            "(set-logic {})",
            if nonlinear { "QF_NIA" } else { "QF_LIA" }
        );
        for (name, sort) in &self.declarations {
            let _ = writeln!(smt, "(declare-const {} {})", symbol(name), sort_to_smtlib(sort));
        }
        for decision in &self.decisions {
            let _ = writeln!(smt, "(declare-const {} Bool)", decision.literal);
        }
        for assertion in &self.assertions {
            let _ = writeln!(smt, "(assert {})", to_smtlib(assertion));
        }
        for decision in &self.decisions {
            let _ = writeln!(
                smt,
                "; line {} {}",
                decision.line,
                decision.direction.token()
            );
            let _ = writeln!(smt, "(assert {})", to_smtlib(&guard(decision)));
        }
        let _ = writeln!(smt, "(check-sat-assuming ({}))", self.assumptions().join(" "));
        smt.push_str("(exit)\n");
        smt
    }
}

fn guard(decision: &GuardedDecision) -> SmtTerm {
    SmtTerm::var(decision.literal.clone()).implies(decision.constraint.clone())
}

/// Lower a task expression into an SMT term.
pub fn lower_expr(expr: &Expr) -> SmtTerm {
    let bin = |l: &Expr, r: &Expr| (lower_expr(l), lower_expr(r));
    match expr {
        Expr::Var(name) => SmtTerm::var(name.clone()),
        Expr::Int(n) => SmtTerm::int(*n),
        Expr::Bool(b) => SmtTerm::bool(*b),
        Expr::Add(l, r) => {
            let (l, r) = bin(l, r);
            l.add(r)
        }
        Expr::Sub(l, r) => {
            let (l, r) = bin(l, r);
            l.sub(r)
        }
        Expr::Mul(l, r) => {
            let (l, r) = bin(l, r);
            l.mul(r)
        }
        Expr::Eq(l, r) => {
            let (l, r) = bin(l, r);
            l.eq(r)
        }
        Expr::Lt(l, r) => {
            let (l, r) = bin(l, r);
            l.lt(r)
        }
        Expr::Le(l, r) => {
            let (l, r) = bin(l, r);
            l.le(r)
        }
        Expr::Gt(l, r) => {
            let (l, r) = bin(l, r);
            l.gt(r)
        }
        Expr::Ge(l, r) => {
            let (l, r) = bin(l, r);
            l.ge(r)
        }
        Expr::And(terms) => SmtTerm::and(terms.iter().map(lower_expr).collect()),
        Expr::Or(terms) => SmtTerm::or(terms.iter().map(lower_expr).collect()),
        Expr::Not(inner) => lower_expr(inner).not(),
        Expr::Implies(l, r) => {
            let (l, r) = bin(l, r);
            l.implies(r)
        }
        Expr::Ite(c, t, e) => SmtTerm::ite(lower_expr(c), lower_expr(t), lower_expr(e)),
    }
}

/// Bounds on an integer variable. Booleans are unconstrained.
pub fn domain_constraints(var: &VariableDecl) -> Vec<SmtTerm> {
    if var.sort != Sort::Int {
        return Vec::new();
    }
    let mut out = Vec::new();
    if let Some(lo) = var.domain.min {
        out.push(SmtTerm::var(var.name.clone()).ge(SmtTerm::int(lo)));
    }
    if let Some(hi) = var.domain.max {
        out.push(SmtTerm::var(var.name.clone()).le(SmtTerm::int(hi)));
    }
    out
}

/// Build the feasibility query of `decisions` against `task`.
///
/// Fails before touching any solver when a decision names a line that is not
/// a branch site.
pub fn encode_trace_query(
    task: &TaskModel,
    decisions: &[Decision],
) -> Result<TraceQuery, EncodeError> {
    let mut guarded = Vec::with_capacity(decisions.len());
    for (index, decision) in decisions.iter().enumerate() {
        let site = decision
            .listing_line()
            .and_then(|line| task.site(line))
            .ok_or(EncodeError::UnknownBranchSite(decision.line))?;
        let predicate = lower_expr(&site.predicate);
        let constraint = if decision.direction.is_taken() {
            predicate
        } else {
            predicate.not()
        };
        guarded.push(GuardedDecision {
            literal: decision_literal(index),
            line: site.id,
            direction: decision.direction,
            constraint,
        });
    }

    let mut declarations = Vec::with_capacity(task.variables.len());
    let mut assertions = Vec::new();
    for var in &task.variables {
        if var.name.starts_with(DECISION_PREFIX) {
            return Err(EncodeError::ReservedName(var.name.clone()));
        }
        declarations.push((var.name.clone(), SmtSort::from(var.sort)));
        assertions.extend(domain_constraints(var));
    }
    assertions.push(lower_expr(&task.reachability_goal));

    Ok(TraceQuery {
        declarations,
        assertions,
        decisions: guarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracez_ir::builtin;

    #[test]
    fn unknown_line_short_circuits() {
        let task = builtin::xor();
        let decisions = [Decision::not_taken(5), Decision::taken(6)];
        assert_eq!(
            encode_trace_query(&task, &decisions),
            Err(EncodeError::UnknownBranchSite(6))
        );
    }

    #[test]
    fn negative_line_is_not_a_site() {
        let task = builtin::xor();
        assert_eq!(
            encode_trace_query(&task, &[Decision::taken(-3)]),
            Err(EncodeError::UnknownBranchSite(-3))
        );
        assert_eq!(
            encode_trace_query(&task, &[Decision::taken(1 << 40)]),
            Err(EncodeError::UnknownBranchSite(1 << 40))
        );
    }

    #[test]
    fn not_taken_negates_the_site_predicate() {
        let task = builtin::dummy();
        let query = encode_trace_query(&task, &[Decision::not_taken(3)]).unwrap();
        assert_eq!(query.decisions.len(), 1);
        assert_eq!(
            query.decisions[0].constraint,
            SmtTerm::var("value").eq(SmtTerm::int(1)).not()
        );
        assert_eq!(query.line_of(&decision_literal(0)), Some(3));
        assert_eq!(query.line_of("nope"), None);
    }

    #[test]
    fn domains_and_goal_are_always_asserted() {
        let task = builtin::xor();
        let query = encode_trace_query(&task, &[]).unwrap();
        // Two bounds per variable plus the goal.
        assert_eq!(query.assertions.len(), 5);
        assert_eq!(
            query.assertions.last(),
            Some(&lower_expr(&task.reachability_goal))
        );
        assert!(query.assumptions().is_empty());
    }

    #[test]
    fn repeated_lines_get_distinct_literals() {
        let task = builtin::dummy();
        let query =
            encode_trace_query(&task, &[Decision::taken(3), Decision::not_taken(3)]).unwrap();
        assert_eq!(
            query.assumptions(),
            vec![decision_literal(0), decision_literal(1)]
        );
    }

    #[test]
    fn reserved_variable_names_are_rejected() {
        let mut task = builtin::dummy();
        task.variables[0].name = decision_literal(0);
        assert_eq!(
            encode_trace_query(&task, &[]),
            Err(EncodeError::ReservedName(decision_literal(0)))
        );
    }

    #[test]
    fn smt2_script_declares_guards_and_checks_under_assumptions() {
        let task = builtin::xor();
        let query = encode_trace_query(
            &task,
            &[Decision::not_taken(5), Decision::taken(7), Decision::taken(10)],
        )
        .unwrap();
        let script = query.to_smt2();
        assert!(script.contains("(set-logic QF_LIA)"));
        assert!(script.contains("(declare-const a Int)"));
        assert!(script.contains("(declare-const __decision_2 Bool)"));
        assert!(script.contains("(assert (>= a 0))"));
        assert!(script.contains("; line 5 F"));
        assert!(script.contains(
            "(assert (=> __decision_0 (not (and (= a 1) (= b 1)))))"
        ));
        assert!(script.contains("(check-sat-assuming (__decision_0 __decision_1 __decision_2))"));
        assert!(script.ends_with("(exit)\n"));
    }

    #[test]
    fn smt2_script_quotes_unusual_variable_names() {
        let mut task = builtin::dummy();
        task.variables[0].name = "user level".into();
        task.branch_sites.get_mut(&3).unwrap().predicate = Expr::var("user level").eq(Expr::int(1));
        task.reachability_goal = Expr::var("user level").gt(Expr::int(0));
        let script = encode_trace_query(&task, &[Decision::taken(3)])
            .unwrap()
            .to_smt2();
        assert!(script.contains("(declare-const |user level| Int)"));
        assert!(script.contains("(assert (=> __decision_0 (= |user level| 1)))"));
        assert!(!script.contains("(= user level"));
    }

    #[test]
    fn multiplication_switches_logic() {
        let mut task = builtin::dummy();
        task.reachability_goal = Expr::var("value")
            .mul(Expr::var("value"))
            .eq(Expr::int(9));
        let query = encode_trace_query(&task, &[]).unwrap();
        assert!(query.to_smt2().contains("(set-logic QF_NIA)"));
    }
}
