//! Solver backends and printers.

pub mod smtlib_printer;
pub mod z3_backend;
