//! Single-condition checks against a preference snapshot.

use pillars_core::PreferenceMap;

use crate::schema::{Condition, Operator};

/// Result of checking one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Match,
    NoMatch,
    /// `=` / `!=` without a target value. Counts as a non-match.
    Malformed,
}

impl ConditionOutcome {
    pub fn is_match(self) -> bool {
        self == ConditionOutcome::Match
    }
}

fn outcome(matched: bool) -> ConditionOutcome {
    if matched {
        ConditionOutcome::Match
    } else {
        ConditionOutcome::NoMatch
    }
}

/// Check `condition` against the selections in `prefs`.
///
/// A node missing from `prefs` has no selection. `!=` is satisfied both by a
/// different selection and by no selection at all.
pub fn check_condition(condition: &Condition, prefs: &PreferenceMap) -> ConditionOutcome {
    let selected = prefs.get(&condition.node_id).copied();

    match &condition.operator {
        Operator::Eq => match condition.value_id {
            Some(target) => outcome(selected == Some(target)),
            None => ConditionOutcome::Malformed,
        },
        Operator::NotEq => match condition.value_id {
            Some(target) => outcome(selected.map_or(true, |v| v != target)),
            None => ConditionOutcome::Malformed,
        },
        Operator::IsNull => outcome(selected.is_none()),
        Operator::IsNotNull => outcome(selected.is_some()),
        Operator::Unknown(_) => ConditionOutcome::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(op: &str, node_id: i64, value_id: Option<i64>) -> Condition {
        Condition {
            id: 1,
            rule_id: 1,
            node_id,
            operator: Operator::parse(op),
            value_id,
            node_name: None,
            value_name: None,
        }
    }

    fn prefs(pairs: &[(i64, i64)]) -> PreferenceMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn eq_requires_matching_selection() {
        let c = cond("=", 10, Some(5));
        assert_eq!(check_condition(&c, &prefs(&[(10, 5)])), ConditionOutcome::Match);
        assert_eq!(check_condition(&c, &prefs(&[(10, 6)])), ConditionOutcome::NoMatch);
        assert_eq!(check_condition(&c, &prefs(&[])), ConditionOutcome::NoMatch);
    }

    #[test]
    fn not_eq_is_permissive_about_absence() {
        let c = cond("!=", 20, Some(7));
        assert_eq!(check_condition(&c, &prefs(&[])), ConditionOutcome::Match);
        assert_eq!(check_condition(&c, &prefs(&[(20, 9)])), ConditionOutcome::Match);
        assert_eq!(check_condition(&c, &prefs(&[(20, 7)])), ConditionOutcome::NoMatch);
    }

    #[test]
    fn angle_bracket_alias_behaves_like_not_eq() {
        let c = cond("<>", 20, Some(7));
        assert_eq!(check_condition(&c, &prefs(&[])), ConditionOutcome::Match);
        assert_eq!(check_condition(&c, &prefs(&[(20, 7)])), ConditionOutcome::NoMatch);
    }

    #[test]
    fn null_checks_are_complements() {
        let is_null = cond("IS NULL", 10, None);
        let not_null = cond("IS NOT NULL", 10, None);
        for p in [prefs(&[]), prefs(&[(10, 1)]), prefs(&[(11, 1)])] {
            assert_ne!(
                check_condition(&is_null, &p).is_match(),
                check_condition(&not_null, &p).is_match()
            );
        }
    }

    #[test]
    fn null_checks_ignore_a_stray_value() {
        let c = cond("IS NOT NULL", 10, Some(99));
        assert_eq!(check_condition(&c, &prefs(&[(10, 5)])), ConditionOutcome::Match);
    }

    #[test]
    fn comparisons_without_value_are_malformed() {
        assert_eq!(
            check_condition(&cond("=", 10, None), &prefs(&[(10, 5)])),
            ConditionOutcome::Malformed
        );
        assert_eq!(
            check_condition(&cond("!=", 10, None), &prefs(&[])),
            ConditionOutcome::Malformed
        );
    }

    #[test]
    fn unknown_operator_never_matches() {
        let c = cond("LIKE", 10, Some(5));
        assert_eq!(check_condition(&c, &prefs(&[(10, 5)])), ConditionOutcome::NoMatch);
    }
}
