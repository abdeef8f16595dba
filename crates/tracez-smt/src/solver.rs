use std::collections::BTreeMap;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Solver verdict. `Unknown` carries the backend's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
}

/// Values the solver committed to. A variable the assertions left free is
/// absent, so callers can tell "solved" from "anything goes".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub values: BTreeMap<String, ModelValue>,
}

impl Model {
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ModelValue::Int(n) => Some(*n),
            ModelValue::Bool(_) => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ModelValue::Bool(b) => Some(*b),
            ModelValue::Int(_) => None,
        }
    }
}

/// The operations a trace feasibility check needs from a backend.
///
/// A solver instance serves one query: variables are declared, facts
/// asserted, and the query is then checked under assumptions (to name the
/// conflicting decisions) or outright (to get a witness).
pub trait SmtSolver {
    type Error: std::error::Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Check the assertions together with the named `Bool` literals.
    fn check_sat_assuming(&mut self, assumptions: &[String]) -> Result<SatResult, Self::Error>;

    /// Assumption literals of the last unsat `check_sat_assuming`.
    fn unsat_core(&mut self) -> Result<Vec<String>, Self::Error>;

    /// Check the assertions and, if satisfiable, read back `vars`.
    fn check_sat_with_model(
        &mut self,
        vars: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;
}
