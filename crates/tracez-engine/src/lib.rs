#![doc = include_str!("../README.md")]

//! Verification engine: feasibility, ground truth, reward.

pub mod feasibility;
pub mod oracle;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod reward;
mod timeout;

pub use oracle::{BranchTruth, ExecutionFailure};
pub use pipeline::{EngineError, EngineOptions, VerificationEngine, VerificationRequest};
pub use registry::{RegistryError, TaskRegistry};
pub use result::{FailureKind, VerificationOutcome, VerificationStatus, Witness};
pub use reward::{MIN_REWARD, PARSE_FAILURE_REWARD};
