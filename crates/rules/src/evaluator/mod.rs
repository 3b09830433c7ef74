//! Warning rule evaluator.
//!
//! A rule fires when it is active, its data-source scope admits the
//! requested source, and every condition holds (logical AND, evaluated in
//! order with short-circuit). A rule without conditions always fires.
//!
//! [`evaluate_rules`] is the pure core over an in-hand snapshot;
//! [`RuleEngine`] pulls that snapshot from its sources on every call.

mod conditions;

use pillars_core::PreferenceMap;
use tracing::{debug, warn};

use crate::error::{EvaluationError, Result};
use crate::schema::{Rule, RuleHit};
use crate::source::{PreferenceSource, RuleSource};

pub use conditions::{check_condition, ConditionOutcome};

// ── Pure evaluation ─────────────────────────────────────────────────

/// Whether every condition of `rule` holds for `prefs`.
///
/// Ignores the active flag and scope. Stops at the first failing condition.
pub fn rule_matches(rule: &Rule, prefs: &PreferenceMap) -> bool {
    for condition in &rule.conditions {
        match check_condition(condition, prefs) {
            ConditionOutcome::Match => {}
            ConditionOutcome::NoMatch => return false,
            ConditionOutcome::Malformed => {
                warn!(
                    rule_id = rule.id,
                    condition_id = condition.id,
                    operator = %condition.operator,
                    "condition has no target value; treating as non-match"
                );
                return false;
            }
        }
    }
    true
}

/// Evaluate `rules` (in the given order) for one data source.
pub fn evaluate_rules(rules: &[Rule], prefs: &PreferenceMap, data_source: &str) -> Vec<RuleHit> {
    rules
        .iter()
        .filter(|rule| {
            if !rule.is_active {
                debug!(rule_id = rule.id, "skipping inactive rule");
                return false;
            }
            if !rule.applies_to(data_source) {
                debug!(rule_id = rule.id, scope = ?rule.scope(), "rule scoped elsewhere");
                return false;
            }
            true
        })
        .filter(|rule| rule_matches(rule, prefs))
        .map(RuleHit::from)
        .collect()
}

// ── Engine ──────────────────────────────────────────────────────────

/// Evaluates stored rules against stored preferences.
///
/// Holds no state besides its source; results always reflect the latest
/// stored data.
pub struct RuleEngine<S> {
    source: S,
}

impl<S> RuleEngine<S>
where
    S: PreferenceSource + RuleSource,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Evaluate every rule for `user`'s selections under `data_source`.
    ///
    /// Both arguments are trimmed and must be non-empty. Any source failure
    /// aborts the whole evaluation.
    pub async fn evaluate(&self, user: &str, data_source: &str) -> Result<Vec<RuleHit>> {
        let user = user.trim();
        let data_source = data_source.trim();
        if user.is_empty() {
            return Err(EvaluationError::InvalidInput("user must not be empty".to_string()));
        }
        if data_source.is_empty() {
            return Err(EvaluationError::InvalidInput(
                "data source must not be empty".to_string(),
            ));
        }

        let prefs = self
            .source
            .preference_map(user, data_source)
            .await
            .map_err(EvaluationError::unavailable)?;
        let rules = self
            .source
            .rules_with_conditions()
            .await
            .map_err(EvaluationError::unavailable)?;

        let hits = evaluate_rules(&rules, &prefs, data_source);
        debug!(
            user,
            data_source,
            selections = prefs.len(),
            rules = rules.len(),
            hits = hits.len(),
            "rules evaluated"
        );
        Ok(hits)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Condition, Operator, Severity};
    use chrono::{TimeZone, Utc};

    fn make_rule(id: i64, conditions: Vec<(&str, i64, Option<i64>)>) -> Rule {
        Rule {
            id,
            name: format!("R{}", id),
            message: format!("message {}", id),
            severity: Severity::Warning,
            is_active: true,
            data_source_filter: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            conditions: conditions
                .into_iter()
                .enumerate()
                .map(|(i, (op, node_id, value_id))| Condition {
                    id: i as i64 + 1,
                    rule_id: id,
                    node_id,
                    operator: Operator::parse(op),
                    value_id,
                    node_name: None,
                    value_name: None,
                })
                .collect(),
        }
    }

    fn prefs(pairs: &[(i64, i64)]) -> PreferenceMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_conditions_always_fire() {
        let rules = vec![make_rule(1, vec![])];
        let hits = evaluate_rules(&rules, &prefs(&[]), "Salesforce API");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rule_id, 1);
        assert_eq!(hits[0].message, "message 1");
    }

    #[test]
    fn inactive_rules_never_fire() {
        let mut rule = make_rule(4, vec![]);
        rule.is_active = false;
        assert!(evaluate_rules(&[rule], &prefs(&[]), "Workday API").is_empty());
    }

    #[test]
    fn out_of_scope_rules_never_fire() {
        let mut rule = make_rule(3, vec![]);
        rule.data_source_filter = Some("Salesforce API".to_string());
        assert!(evaluate_rules(&[rule.clone()], &prefs(&[]), "Workday API").is_empty());
        assert_eq!(evaluate_rules(&[rule], &prefs(&[]), "Salesforce API").len(), 1);
    }

    #[test]
    fn conditions_are_anded() {
        let rule = make_rule(2, vec![("=", 10, Some(5)), ("!=", 20, Some(7))]);
        assert_eq!(evaluate_rules(&[rule.clone()], &prefs(&[(10, 5), (20, 9)]), "x").len(), 1);
        assert!(evaluate_rules(&[rule.clone()], &prefs(&[(10, 5), (20, 7)]), "x").is_empty());
        assert!(evaluate_rules(&[rule], &prefs(&[(10, 6), (20, 9)]), "x").is_empty());
    }

    #[test]
    fn malformed_condition_fails_closed() {
        let rule = make_rule(5, vec![("IS NULL", 10, None), ("!=", 20, None)]);
        assert!(!rule_matches(&rule, &prefs(&[])));
    }

    #[test]
    fn unknown_operator_blocks_rule() {
        let rule = make_rule(6, vec![("IS NULL", 10, None), ("BETWEEN", 20, Some(1))]);
        assert!(evaluate_rules(&[rule], &prefs(&[]), "x").is_empty());
    }

    #[test]
    fn hits_keep_input_order() {
        let rules = vec![make_rule(9, vec![]), make_rule(3, vec![]), make_rule(7, vec![])];
        let ids: Vec<_> = evaluate_rules(&rules, &prefs(&[]), "x")
            .into_iter()
            .map(|h| h.rule_id)
            .collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }
}
