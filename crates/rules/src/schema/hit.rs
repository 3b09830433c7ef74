//! Evaluation output.

use pillars_core::RuleId;
use serde::{Deserialize, Serialize};

use super::{Rule, Severity};

/// A rule whose conditions all held for the evaluated selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RuleHit {
    pub rule_id: RuleId,
    pub name: String,
    pub severity: Severity,
    pub message: String,
}

impl From<&Rule> for RuleHit {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id,
            name: rule.name.clone(),
            severity: rule.severity,
            message: rule.message.clone(),
        }
    }
}
