//! Rule draft validation.
//!
//! Drafts arrive as loose JSON (free-text operator, optional everything).
//! [`RuleDraft::validate`] and [`ConditionDraft::validate`] normalise them
//! into [`ValidRule`] / [`ValidCondition`], which are the only shapes the
//! rule store accepts.
//!
//! Checks that need the taxonomy (is the target value mapped to the node?)
//! happen in the store, inside the write transaction.

use pillars_core::{clean_name, clean_optional, NodeId, ValueId};
use serde::{Deserialize, Serialize};

use crate::schema::{Operator, Severity};

/// Longest warning message accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 400;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rule name is required")]
    MissingName,

    #[error("warning message is required")]
    MissingMessage,

    #[error("warning message is {len} characters (limit {limit})", limit = MAX_MESSAGE_LEN)]
    MessageTooLong { len: usize },

    #[error("{path}: unknown operator '{operator}' (expected one of =, !=, IS NULL, IS NOT NULL)")]
    UnknownOperator { path: String, operator: String },

    #[error("{path}: operator '{operator}' requires a value")]
    MissingValue { path: String, operator: Operator },
}

// ── Drafts ──────────────────────────────────────────────────────────

fn default_active() -> bool {
    true
}

/// Editable rule metadata as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RuleMetaDraft {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub data_source_filter: Option<String>,
}

/// One condition as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConditionDraft {
    pub node_id: NodeId,
    #[schema(example = "=")]
    pub operator: String,
    #[serde(default)]
    pub value_id: Option<ValueId>,
}

/// A whole rule (metadata plus conditions) submitted in one request.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RuleDraft {
    #[serde(flatten)]
    pub meta: RuleMetaDraft,
    #[serde(default)]
    pub conditions: Vec<ConditionDraft>,
}

// ── Validated forms ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    pub name: String,
    pub message: String,
    pub severity: Severity,
    pub is_active: bool,
    pub data_source_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCondition {
    pub node_id: NodeId,
    /// Always a known operator.
    pub operator: Operator,
    /// `Some` exactly when the operator compares against a value.
    pub value_id: Option<ValueId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRule {
    pub meta: RuleMeta,
    pub conditions: Vec<ValidCondition>,
}

// ── Validation ──────────────────────────────────────────────────────

impl RuleMetaDraft {
    pub fn validate(&self) -> Result<RuleMeta, ValidationError> {
        let name = clean_name(&self.name).ok_or(ValidationError::MissingName)?;
        let message = clean_name(&self.message).ok_or(ValidationError::MissingMessage)?;
        let len = message.chars().count();
        if len > MAX_MESSAGE_LEN {
            return Err(ValidationError::MessageTooLong { len });
        }

        Ok(RuleMeta {
            name,
            message,
            severity: self.severity,
            is_active: self.is_active,
            data_source_filter: clean_optional(self.data_source_filter.as_deref()),
        })
    }
}

impl ConditionDraft {
    pub fn validate(&self) -> Result<ValidCondition, ValidationError> {
        self.validate_at("condition")
    }

    fn validate_at(&self, path: &str) -> Result<ValidCondition, ValidationError> {
        let operator = Operator::parse(&self.operator);
        if !operator.is_known() {
            return Err(ValidationError::UnknownOperator {
                path: path.to_string(),
                operator: self.operator.trim().to_string(),
            });
        }

        let value_id = if operator.requires_value() {
            match self.value_id {
                Some(v) => Some(v),
                None => {
                    return Err(ValidationError::MissingValue {
                        path: path.to_string(),
                        operator,
                    })
                }
            }
        } else {
            None
        };

        Ok(ValidCondition {
            node_id: self.node_id,
            operator,
            value_id,
        })
    }
}

impl RuleDraft {
    pub fn validate(&self) -> Result<ValidRule, ValidationError> {
        let meta = self.meta.validate()?;
        let conditions = self
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| c.validate_at(&format!("conditions[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValidRule { meta, conditions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, message: &str) -> RuleMetaDraft {
        RuleMetaDraft {
            name: name.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
            is_active: true,
            data_source_filter: None,
        }
    }

    fn cond(op: &str, value_id: Option<i64>) -> ConditionDraft {
        ConditionDraft {
            node_id: 10,
            operator: op.to_string(),
            value_id,
        }
    }

    #[test]
    fn meta_is_trimmed() {
        let mut draft = meta("  Unstructured PII  ", " Review masking ");
        draft.data_source_filter = Some("   ".to_string());
        let valid = draft.validate().unwrap();
        assert_eq!(valid.name, "Unstructured PII");
        assert_eq!(valid.message, "Review masking");
        assert_eq!(valid.data_source_filter, None);
    }

    #[test]
    fn blank_name_and_message_rejected() {
        assert_eq!(meta(" ", "m").validate(), Err(ValidationError::MissingName));
        assert_eq!(meta("n", "\t").validate(), Err(ValidationError::MissingMessage));
    }

    #[test]
    fn message_length_is_counted_in_chars() {
        assert!(meta("n", &"é".repeat(MAX_MESSAGE_LEN)).validate().is_ok());
        assert_eq!(
            meta("n", &"x".repeat(MAX_MESSAGE_LEN + 1)).validate(),
            Err(ValidationError::MessageTooLong { len: MAX_MESSAGE_LEN + 1 })
        );
    }

    #[test]
    fn angle_brackets_normalise_to_not_eq() {
        let c = cond("<>", Some(7)).validate().unwrap();
        assert_eq!(c.operator, Operator::NotEq);
        assert_eq!(c.value_id, Some(7));
    }

    #[test]
    fn null_operators_drop_value() {
        let c = cond("is null", Some(7)).validate().unwrap();
        assert_eq!(c.operator, Operator::IsNull);
        assert_eq!(c.value_id, None);
    }

    #[test]
    fn comparison_needs_value() {
        let err = cond("=", None).validate().unwrap_err();
        assert!(matches!(err, ValidationError::MissingValue { .. }));
    }

    #[test]
    fn unknown_operator_reports_position() {
        let draft = RuleDraft {
            meta: meta("n", "m"),
            conditions: vec![cond("=", Some(1)), cond("LIKE", Some(2))],
        };
        let err = draft.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownOperator {
                path: "conditions[1]".to_string(),
                operator: "LIKE".to_string(),
            }
        );
        assert!(err.to_string().starts_with("conditions[1]: unknown operator 'LIKE'"));
    }

    #[test]
    fn draft_deserializes_flat() {
        let draft: RuleDraft = serde_json::from_str(
            r#"{"name":"R","message":"M","conditions":[{"node_id":10,"operator":"IS NULL"}]}"#,
        )
        .unwrap();
        assert_eq!(draft.meta.severity, Severity::Warning);
        assert!(draft.meta.is_active);
        let valid = draft.validate().unwrap();
        assert_eq!(valid.conditions.len(), 1);
    }
}
