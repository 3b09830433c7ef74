//! Warning rule engine for the pillar taxonomy.
//!
//! This crate provides:
//! - Rule, condition, operator and severity types
//! - Draft validation for rules authored through the API
//! - The evaluator: AND-ed node conditions against a user's selections
//! - Source traits the evaluator reads through, plus an in-memory source

pub mod error;
pub mod evaluator;
pub mod memory;
pub mod schema;
pub mod source;
pub mod validation;

pub use error::{EvaluationError, Result};
pub use evaluator::{evaluate_rules, RuleEngine};
pub use memory::MemorySource;
pub use source::{PreferenceSource, RuleSource};
