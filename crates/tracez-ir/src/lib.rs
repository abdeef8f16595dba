#![doc = include_str!("../README.md")]

//! Task model and built-in benchmark definitions.
//!
//! A [`task::TaskModel`] is constructed once, validated, and then shared
//! read-only across any number of verifications.

pub mod builtin;
pub mod expr;
pub mod listing;
pub mod task;
pub mod template;

pub use expr::{eval_bool, Assignment, EvalError, Expr, Sort, SortError, Value};
pub use task::{
    BranchSite, CommandSpec, CommandStep, Domain, ReportSpec, RunnerSpec, TaskError, TaskModel,
    VariableDecl, FALLBACK_SENTINEL,
};
