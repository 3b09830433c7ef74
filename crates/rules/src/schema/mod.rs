//! Warning rule schema types.
//!
//! - `Rule` / `Condition`: what the rule store returns
//! - `Operator` / `Severity`: closed vocabularies with lenient parsing
//! - `RuleHit`: what the evaluator produces

mod hit;
mod operator;
mod rule;
mod severity;

pub use hit::*;
pub use operator::*;
pub use rule::*;
pub use severity::*;
