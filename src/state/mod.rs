//! Version State Evaluator
//!
//! Derives the publication status of a record from the version numbers its
//! Draft and Live rows carry. Every query goes back to the store; nothing is
//! cached between calls.

mod evaluator;

pub use evaluator::{VersionStateEvaluator, VersionStatus};
