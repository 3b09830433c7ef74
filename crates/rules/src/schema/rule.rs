//! Warning rules and their conditions as loaded from the rule store.

use chrono::{DateTime, Utc};
use pillars_core::{ConditionId, NodeId, RuleId, ValueId};
use serde::{Deserialize, Serialize};

use super::{Operator, Severity};

/// One AND-ed clause of a rule: `node <operator> [value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Condition {
    pub id: ConditionId,
    pub rule_id: RuleId,
    pub node_id: NodeId,
    #[schema(value_type = String, example = "=")]
    pub operator: Operator,
    /// Target value; only meaningful for `=` and `!=`.
    pub value_id: Option<ValueId>,
    /// Display name of the node, when the store joined it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Display name of the target value, when the store joined it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
}

impl Condition {
    /// Render as `Node op Value`, falling back to ids when names are missing.
    pub fn describe(&self) -> String {
        let node = self
            .node_name
            .clone()
            .unwrap_or_else(|| format!("node#{}", self.node_id));
        if !self.operator.requires_value() && self.operator.is_known() {
            return format!("{} {}", node, self.operator);
        }
        let value = match (&self.value_name, self.value_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("value#{}", id),
            (None, None) => "NULL".to_string(),
        };
        format!("{} {} {}", node, self.operator, value)
    }
}

/// A named warning rule: metadata plus its ordered condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub message: String,
    pub severity: Severity,
    pub is_active: bool,
    /// Restricts the rule to one data source. Unset or blank applies everywhere.
    pub data_source_filter: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Conditions in ascending evaluation order.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// The effective scope: `None` when the filter is unset or blank.
    pub fn scope(&self) -> Option<&str> {
        self.data_source_filter
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Whether the rule's scope admits `data_source` (exact comparison).
    pub fn applies_to(&self, data_source: &str) -> bool {
        match self.scope() {
            Some(scope) => scope == data_source,
            None => true,
        }
    }

    /// All conditions rendered and joined with ` AND `.
    pub fn describe_conditions(&self) -> String {
        self.conditions
            .iter()
            .map(Condition::describe)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(filter: Option<&str>) -> Rule {
        Rule {
            id: 1,
            name: "r".to_string(),
            message: "m".to_string(),
            severity: Severity::Warning,
            is_active: true,
            data_source_filter: filter.map(str::to_string),
            created_at: Utc::now(),
            conditions: Vec::new(),
        }
    }

    fn condition(op: &str, value_id: Option<ValueId>) -> Condition {
        Condition {
            id: 1,
            rule_id: 1,
            node_id: 10,
            operator: Operator::parse(op),
            value_id,
            node_name: Some("Source Format".to_string()),
            value_name: value_id.map(|_| "Unstructured".to_string()),
        }
    }

    #[test]
    fn blank_filter_applies_everywhere() {
        assert!(rule(None).applies_to("Salesforce API"));
        assert!(rule(Some("")).applies_to("Salesforce API"));
        assert!(rule(Some("   ")).applies_to("Workday API"));
        assert_eq!(rule(Some("  ")).scope(), None);
    }

    #[test]
    fn filter_is_exact() {
        let r = rule(Some("Salesforce API"));
        assert!(r.applies_to("Salesforce API"));
        assert!(!r.applies_to("Workday API"));
        assert!(!r.applies_to("salesforce api"));
    }

    #[test]
    fn describe_renders_like_the_rule_list() {
        assert_eq!(condition("=", Some(5)).describe(), "Source Format = Unstructured");
        assert_eq!(condition("IS NULL", None).describe(), "Source Format IS NULL");
        assert_eq!(condition("!=", None).describe(), "Source Format != NULL");

        let mut r = rule(None);
        r.conditions = vec![condition("=", Some(5)), condition("IS NOT NULL", None)];
        assert_eq!(
            r.describe_conditions(),
            "Source Format = Unstructured AND Source Format IS NOT NULL"
        );
    }
}
