use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;
use z3::SatResult as Z3SatResult;

use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::{ArithOp, CmpOp, SmtTerm};

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    last_assumptions: Vec<(String, z3::ast::Bool)>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            last_assumptions: Vec::new(),
        }
    }

    /// Solver whose checks give up with `unknown` after `timeout_secs`.
    /// Zero means unbounded.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        let solver = Self::new();
        if timeout_secs > 0 {
            let timeout_ms = u32::try_from(timeout_secs.saturating_mul(1000)).unwrap_or(u32::MAX);
            let mut params = z3::Params::new();
            params.set_u32("timeout", timeout_ms);
            params.set_u32("solver2_timeout", timeout_ms);
            solver.solver.set_params(&params);
        }
        solver
    }

    fn int_binop(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
    ) -> Result<(z3::ast::Int, z3::ast::Int), Z3Error> {
        Ok((
            self.translate_term(lhs)?.into_int()?,
            self.translate_term(rhs)?.into_int()?,
        ))
    }

    fn bool_list(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(Z3Term::into_bool))
            .collect()
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            SmtTerm::Int(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            SmtTerm::Bool(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::Arith(op, lhs, rhs) => {
                let (l, r) = self.int_binop(lhs, rhs)?;
                Ok(Z3Term::Int(match op {
                    ArithOp::Add => &l + &r,
                    ArithOp::Sub => &l - &r,
                    ArithOp::Mul => &l * &r,
                }))
            }
            SmtTerm::Cmp(CmpOp::Eq, lhs, rhs) => {
                match (self.translate_term(lhs)?, self.translate_term(rhs)?) {
                    (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Bool(l.eq(&r))),
                    (Z3Term::Bool(l), Z3Term::Bool(r)) => Ok(Z3Term::Bool(l.eq(&r))),
                    _ => Err(Z3Error::Internal("sort mismatch in Eq".into())),
                }
            }
            SmtTerm::Cmp(op, lhs, rhs) => {
                let (l, r) = self.int_binop(lhs, rhs)?;
                Ok(Z3Term::Bool(match op {
                    CmpOp::Lt => l.lt(&r),
                    CmpOp::Le => l.le(&r),
                    CmpOp::Gt => l.gt(&r),
                    CmpOp::Ge => l.ge(&r),
                    CmpOp::Eq => l.eq(&r),
                }))
            }
            SmtTerm::And(terms) => {
                let bools = self.bool_list(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.bool_list(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                match (self.translate_term(then)?, self.translate_term(els)?) {
                    (Z3Term::Int(t), Z3Term::Int(e)) => Ok(Z3Term::Int(c.ite(&t, &e))),
                    (Z3Term::Bool(t), Z3Term::Bool(e)) => Ok(Z3Term::Bool(c.ite(&t, &e))),
                    _ => Err(Z3Error::Internal("sort mismatch in ITE".into())),
                }
            }
        }
    }

    fn verdict(&self, result: Z3SatResult) -> SatResult {
        let verdict = match result {
            Z3SatResult::Sat => SatResult::Sat,
            Z3SatResult::Unsat => SatResult::Unsat,
            Z3SatResult::Unknown => SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".into()),
            ),
        };
        debug!(?verdict, "z3 check finished");
        verdict
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                self.int_vars
                    .insert(name.to_string(), z3::ast::Int::new_const(name));
            }
            SmtSort::Bool => {
                self.bool_vars
                    .insert(name.to_string(), z3::ast::Bool::new_const(name));
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => {
                let z3_model = self
                    .solver
                    .get_model()
                    .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
                let mut values = BTreeMap::new();

                // Without model completion an unconstrained constant evaluates
                // to itself rather than a numeral, so it stays absent.
                for &(name, sort) in var_names {
                    match sort {
                        SmtSort::Int => {
                            let value = self
                                .int_vars
                                .get(name)
                                .and_then(|v| z3_model.eval::<z3::ast::Int>(v, false))
                                .and_then(|v| v.as_i64());
                            if let Some(n) = value {
                                values.insert(name.to_string(), ModelValue::Int(n));
                            }
                        }
                        SmtSort::Bool => {
                            let value = self
                                .bool_vars
                                .get(name)
                                .and_then(|v| z3_model.eval::<z3::ast::Bool>(v, false))
                                .and_then(|v| v.as_bool());
                            if let Some(b) = value {
                                values.insert(name.to_string(), ModelValue::Bool(b));
                            }
                        }
                    }
                }

                Ok((SatResult::Sat, Some(Model { values })))
            }
            other => Ok((self.verdict(other), None)),
        }
    }

    fn check_sat_assuming(&mut self, assumptions: &[String]) -> Result<SatResult, Z3Error> {
        self.last_assumptions = assumptions
            .iter()
            .map(|name| {
                self.bool_vars
                    .get(name)
                    .map(|lit| (name.clone(), lit.clone()))
                    .ok_or_else(|| Z3Error::UnknownVariable(name.clone()))
            })
            .collect::<Result<_, _>>()?;
        let lits: Vec<z3::ast::Bool> = self.last_assumptions.iter().map(|(_, l)| l.clone()).collect();
        Ok(self.verdict(self.solver.check_assumptions(&lits)))
    }

    fn unsat_core(&mut self) -> Result<Vec<String>, Z3Error> {
        let core = self.solver.get_unsat_core();
        Ok(self
            .last_assumptions
            .iter()
            .filter(|(_, lit)| core.contains(lit))
            .map(|(name, _)| name.clone())
            .collect())
    }
}
