//! Symbolic predicate language over a task's variables.
//!
//! Expressions are solver-agnostic. `tracez-smt` lowers them into SMT terms;
//! [`Expr::eval`] evaluates them on a concrete assignment.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sort of a task variable or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Int,
    Bool,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Int => write!(f, "Int"),
            Sort::Bool => write!(f, "Bool"),
        }
    }
}

/// A concrete value of a variable or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn sort(&self) -> Sort {
        match self {
            Value::Int(_) => Sort::Int,
            Value::Bool(_) => Sort::Bool,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(_) => None,
        }
    }

    /// Command-line rendering. Booleans become `1` / `0`.
    pub fn to_arg(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => u8::from(*b).to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Concrete value per variable name.
pub type Assignment = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("variable `{0}` has no value")]
    Unbound(String),
    #[error("sort mismatch: expected {expected}, found {found}")]
    SortMismatch { expected: Sort, found: Sort },
    #[error("integer overflow while evaluating `{0}`")]
    Overflow(&'static str),
}

/// Symbolic expression over integer and boolean variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Var(String),
    Int(i64),
    Bool(bool),

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),

    Eq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),

    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn bool(b: bool) -> Self {
        Expr::Bool(b)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::And(terms)
    }

    pub fn or(terms: Vec<Expr>) -> Self {
        Expr::Or(terms)
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Names of all variables referenced by this expression.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Int(_) | Expr::Bool(_) => {}
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Eq(l, r)
            | Expr::Lt(l, r)
            | Expr::Le(l, r)
            | Expr::Gt(l, r)
            | Expr::Ge(l, r)
            | Expr::Implies(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Expr::And(terms) | Expr::Or(terms) => {
                for term in terms {
                    term.collect_vars(out);
                }
            }
            Expr::Not(inner) => inner.collect_vars(out),
            Expr::Ite(c, t, e) => {
                c.collect_vars(out);
                t.collect_vars(out);
                e.collect_vars(out);
            }
        }
    }

    /// Infer the sort of this expression given the sorts of its variables.
    ///
    /// `sort_of_var` returns `None` for undeclared names.
    pub fn sort_with<F>(&self, sort_of_var: &F) -> Result<Sort, SortError>
    where
        F: Fn(&str) -> Option<Sort>,
    {
        let expect = |e: &Expr, want: Sort| -> Result<(), SortError> {
            let got = e.sort_with(sort_of_var)?;
            if got == want {
                Ok(())
            } else {
                Err(SortError::Mismatch {
                    expected: want,
                    found: got,
                })
            }
        };
        match self {
            Expr::Var(name) => sort_of_var(name).ok_or_else(|| SortError::Undeclared(name.clone())),
            Expr::Int(_) => Ok(Sort::Int),
            Expr::Bool(_) => Ok(Sort::Bool),
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) => {
                expect(l, Sort::Int)?;
                expect(r, Sort::Int)?;
                Ok(Sort::Int)
            }
            Expr::Lt(l, r) | Expr::Le(l, r) | Expr::Gt(l, r) | Expr::Ge(l, r) => {
                expect(l, Sort::Int)?;
                expect(r, Sort::Int)?;
                Ok(Sort::Bool)
            }
            Expr::Eq(l, r) => {
                let ls = l.sort_with(sort_of_var)?;
                expect(r, ls)?;
                Ok(Sort::Bool)
            }
            Expr::And(terms) | Expr::Or(terms) => {
                for term in terms {
                    expect(term, Sort::Bool)?;
                }
                Ok(Sort::Bool)
            }
            Expr::Not(inner) => {
                expect(inner, Sort::Bool)?;
                Ok(Sort::Bool)
            }
            Expr::Implies(l, r) => {
                expect(l, Sort::Bool)?;
                expect(r, Sort::Bool)?;
                Ok(Sort::Bool)
            }
            Expr::Ite(c, t, e) => {
                expect(c, Sort::Bool)?;
                let ts = t.sort_with(sort_of_var)?;
                expect(e, ts)?;
                Ok(ts)
            }
        }
    }

    /// Evaluate on a concrete assignment.
    pub fn eval(&self, env: &Assignment) -> Result<Value, EvalError> {
        match self {
            Expr::Var(name) => env
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::Unbound(name.clone())),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Add(l, r) => int_op(l, r, env, "+", i64::checked_add),
            Expr::Sub(l, r) => int_op(l, r, env, "-", i64::checked_sub),
            Expr::Mul(l, r) => int_op(l, r, env, "*", i64::checked_mul),
            Expr::Eq(l, r) => {
                let lv = l.eval(env)?;
                let rv = r.eval(env)?;
                if lv.sort() != rv.sort() {
                    return Err(EvalError::SortMismatch {
                        expected: lv.sort(),
                        found: rv.sort(),
                    });
                }
                Ok(Value::Bool(lv == rv))
            }
            Expr::Lt(l, r) => cmp_op(l, r, env, |a, b| a < b),
            Expr::Le(l, r) => cmp_op(l, r, env, |a, b| a <= b),
            Expr::Gt(l, r) => cmp_op(l, r, env, |a, b| a > b),
            Expr::Ge(l, r) => cmp_op(l, r, env, |a, b| a >= b),
            Expr::And(terms) => {
                let mut all = true;
                for term in terms {
                    all &= eval_bool(term, env)?;
                }
                Ok(Value::Bool(all))
            }
            Expr::Or(terms) => {
                let mut any = false;
                for term in terms {
                    any |= eval_bool(term, env)?;
                }
                Ok(Value::Bool(any))
            }
            Expr::Not(inner) => Ok(Value::Bool(!eval_bool(inner, env)?)),
            Expr::Implies(l, r) => {
                let lv = eval_bool(l, env)?;
                let rv = eval_bool(r, env)?;
                Ok(Value::Bool(!lv || rv))
            }
            Expr::Ite(c, t, e) => {
                if eval_bool(c, env)? {
                    t.eval(env)
                } else {
                    e.eval(env)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("undeclared variable `{0}`")]
    Undeclared(String),
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: Sort, found: Sort },
}

fn eval_int(e: &Expr, env: &Assignment) -> Result<i64, EvalError> {
    let v = e.eval(env)?;
    v.as_int().ok_or(EvalError::SortMismatch {
        expected: Sort::Int,
        found: v.sort(),
    })
}

/// Evaluate a boolean expression.
pub fn eval_bool(e: &Expr, env: &Assignment) -> Result<bool, EvalError> {
    let v = e.eval(env)?;
    v.as_bool().ok_or(EvalError::SortMismatch {
        expected: Sort::Bool,
        found: v.sort(),
    })
}

fn int_op(
    l: &Expr,
    r: &Expr,
    env: &Assignment,
    op: &'static str,
    f: fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    let a = eval_int(l, env)?;
    let b = eval_int(r, env)?;
    f(a, b).map(Value::Int).ok_or(EvalError::Overflow(op))
}

fn cmp_op(
    l: &Expr,
    r: &Expr,
    env: &Assignment,
    f: fn(i64, i64) -> bool,
) -> Result<Value, EvalError> {
    Ok(Value::Bool(f(eval_int(l, env)?, eval_int(r, env)?)))
}
