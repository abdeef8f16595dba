#![doc = include_str!("../README.md")]

//! SMT encoding and solver integration for branch-trace feasibility.

pub mod backends;
pub mod encoder;
pub mod solver;
pub mod sorts;
pub mod terms;
