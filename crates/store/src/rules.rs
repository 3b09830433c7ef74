//! Warning rule persistence.
//!
//! A rule owns its conditions: creating a rule writes both in one
//! transaction, and deleting it cascades to the conditions. Every write goes
//! through the draft validation in `pillars_rules::validation` first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pillars_core::{ConditionId, NodeId, RuleId, ValueId};
use pillars_rules::schema::{Condition, Operator, Rule, Severity};
use pillars_rules::validation::{ConditionDraft, RuleDraft, RuleMetaDraft, ValidCondition};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use crate::error::{is_fk_violation, StoreError};
use crate::taxonomy::TaxonomyStore;

// ── Row types ────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: RuleId,
    name: String,
    message: String,
    severity: String,
    is_active: bool,
    data_source_filter: Option<String>,
    created_at: DateTime<Utc>,
}

impl RuleRow {
    fn into_rule(self, conditions: Vec<Condition>) -> Rule {
        let severity = self.severity.parse::<Severity>().unwrap_or_else(|e| {
            warn!(rule_id = self.id, "{}; using Warning", e);
            Severity::Warning
        });
        Rule {
            id: self.id,
            name: self.name,
            message: self.message,
            severity,
            is_active: self.is_active,
            data_source_filter: self.data_source_filter,
            created_at: self.created_at,
            conditions,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConditionRow {
    id: ConditionId,
    rule_id: RuleId,
    node_id: NodeId,
    operator: String,
    value_id: Option<ValueId>,
    node_name: Option<String>,
    value_name: Option<String>,
}

impl From<ConditionRow> for Condition {
    fn from(row: ConditionRow) -> Self {
        Condition {
            id: row.id,
            rule_id: row.rule_id,
            node_id: row.node_id,
            operator: Operator::parse(&row.operator),
            value_id: row.value_id,
            node_name: row.node_name,
            value_name: row.value_name,
        }
    }
}

/// One line of the rule list: metadata plus rendered condition text.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RuleSummary {
    pub id: RuleId,
    pub name: String,
    pub message: String,
    pub severity: Severity,
    pub is_active: bool,
    pub data_source_filter: Option<String>,
    pub created_at: DateTime<Utc>,
    /// e.g. `Source Format = Unstructured AND Contains PII IS NOT NULL`
    pub conditions: String,
}

impl From<&Rule> for RuleSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name.clone(),
            message: rule.message.clone(),
            severity: rule.severity,
            is_active: rule.is_active,
            data_source_filter: rule.data_source_filter.clone(),
            created_at: rule.created_at,
            conditions: rule.describe_conditions(),
        }
    }
}

const RULE_COLUMNS: &str =
    "id, name, message, severity, is_active, data_source_filter, created_at";

const CONDITION_SELECT: &str = "SELECT c.id, c.rule_id, c.node_id, c.operator, c.value_id,
            n.name AS node_name, v.name AS value_name
     FROM warning_rule_condition c
     LEFT JOIN pillar_node n ON n.id = c.node_id
     LEFT JOIN pillar_node_value v ON v.id = c.value_id";

// ── Helpers ──────────────────────────────────────────────────────────

/// Check the condition's node exists and its value is mapped to it.
async fn check_condition_refs(
    conn: &mut PgConnection,
    condition: &ValidCondition,
) -> Result<(), StoreError> {
    if let Some(value_id) = condition.value_id {
        if !TaxonomyStore::lock_mapping(conn, condition.node_id, value_id).await? {
            return Err(StoreError::validation(format!(
                "value {} is not mapped to pillar node {}",
                value_id, condition.node_id
            )));
        }
    } else {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pillar_node WHERE id = $1)",
        )
        .bind(condition.node_id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(StoreError::validation(format!(
                "pillar node {} does not exist",
                condition.node_id
            )));
        }
    }
    Ok(())
}

async fn insert_condition(
    conn: &mut PgConnection,
    rule_id: RuleId,
    condition: &ValidCondition,
) -> Result<ConditionId, StoreError> {
    let id = sqlx::query_scalar::<_, ConditionId>(
        "INSERT INTO warning_rule_condition (rule_id, node_id, operator, value_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(rule_id)
    .bind(condition.node_id)
    .bind(condition.operator.as_str())
    .bind(condition.value_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_fk_violation(&e) {
            StoreError::not_found("rule", rule_id)
        } else {
            StoreError::from(e)
        }
    })?;
    Ok(id)
}

// ── Store ────────────────────────────────────────────────────────────

/// Stateless store for `warning_rule` and `warning_rule_condition`.
pub struct RuleStore;

impl RuleStore {
    /// Every rule with its conditions, newest first then highest id first.
    /// Conditions are in ascending id order.
    ///
    /// Headers and conditions are read from one snapshot, so a rule deleted
    /// mid-read never comes back with an empty (always matching) condition
    /// list.
    pub async fn list_with_conditions(pool: &PgPool) -> Result<Vec<Rule>, StoreError> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rules = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM warning_rule ORDER BY created_at DESC, id DESC",
            RULE_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let rows = sqlx::query_as::<_, ConditionRow>(&format!(
            "{} ORDER BY c.rule_id, c.id",
            CONDITION_SELECT
        ))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut by_rule: HashMap<RuleId, Vec<Condition>> = HashMap::new();
        for row in rows {
            by_rule.entry(row.rule_id).or_default().push(row.into());
        }

        Ok(rules
            .into_iter()
            .map(|r| {
                let conditions = by_rule.remove(&r.id).unwrap_or_default();
                r.into_rule(conditions)
            })
            .collect())
    }

    /// Rule list with rendered condition text, in store order.
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<RuleSummary>, StoreError> {
        let rules = Self::list_with_conditions(pool).await?;
        Ok(rules.iter().map(RuleSummary::from).collect())
    }

    pub async fn get(pool: &PgPool, id: RuleId) -> Result<Option<Rule>, StoreError> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM warning_rule WHERE id = $1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let conditions = sqlx::query_as::<_, ConditionRow>(&format!(
            "{} WHERE c.rule_id = $1 ORDER BY c.id",
            CONDITION_SELECT
        ))
        .bind(id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Condition::from)
        .collect();

        Ok(Some(row.into_rule(conditions)))
    }

    /// Validate a draft and write the rule plus all its conditions atomically.
    pub async fn create(pool: &PgPool, draft: &RuleDraft) -> Result<Rule, StoreError> {
        let valid = draft.validate()?;
        let mut tx = pool.begin().await?;

        for condition in &valid.conditions {
            check_condition_refs(&mut tx, condition).await?;
        }

        let meta = &valid.meta;
        let rule_id = sqlx::query_scalar::<_, RuleId>(
            "INSERT INTO warning_rule (name, message, severity, is_active, data_source_filter)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(&meta.name)
        .bind(&meta.message)
        .bind(meta.severity.as_str())
        .bind(meta.is_active)
        .bind(&meta.data_source_filter)
        .fetch_one(&mut *tx)
        .await?;

        for condition in &valid.conditions {
            insert_condition(&mut tx, rule_id, condition).await?;
        }
        tx.commit().await?;

        info!(rule_id, name = %meta.name, conditions = valid.conditions.len(), "warning rule created");
        Self::get(pool, rule_id)
            .await?
            .ok_or_else(|| StoreError::not_found("rule", rule_id))
    }

    /// Replace a rule's metadata. Conditions are untouched.
    pub async fn update_meta(
        pool: &PgPool,
        id: RuleId,
        draft: &RuleMetaDraft,
    ) -> Result<Rule, StoreError> {
        let meta = draft.validate()?;
        let result = sqlx::query(
            "UPDATE warning_rule
             SET name = $2, message = $3, severity = $4, is_active = $5, data_source_filter = $6
             WHERE id = $1",
        )
        .bind(id)
        .bind(&meta.name)
        .bind(&meta.message)
        .bind(meta.severity.as_str())
        .bind(meta.is_active)
        .bind(&meta.data_source_filter)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("rule", id));
        }
        Self::get(pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found("rule", id))
    }

    /// Flip the active flag. Returns the new state.
    pub async fn toggle(pool: &PgPool, id: RuleId) -> Result<bool, StoreError> {
        let active = sqlx::query_scalar::<_, bool>(
            "UPDATE warning_rule SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("rule", id))?;
        info!(rule_id = id, active, "warning rule toggled");
        Ok(active)
    }

    /// Delete a rule; its conditions go with it.
    pub async fn delete(pool: &PgPool, id: RuleId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM warning_rule WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("rule", id));
        }
        info!(rule_id = id, "warning rule deleted");
        Ok(())
    }

    /// Append a condition to an existing rule.
    pub async fn add_condition(
        pool: &PgPool,
        rule_id: RuleId,
        draft: &ConditionDraft,
    ) -> Result<Condition, StoreError> {
        let valid = draft.validate()?;
        let mut tx = pool.begin().await?;
        check_condition_refs(&mut tx, &valid).await?;
        let id = insert_condition(&mut tx, rule_id, &valid).await?;

        let row = sqlx::query_as::<_, ConditionRow>(&format!("{} WHERE c.id = $1", CONDITION_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn delete_condition(pool: &PgPool, id: ConditionId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM warning_rule_condition WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("condition", id));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn row(severity: &str) -> RuleRow {
        RuleRow {
            id: 3,
            name: "PII in free text".to_string(),
            message: "Mask before export".to_string(),
            severity: severity.to_string(),
            is_active: true,
            data_source_filter: Some("Salesforce API".to_string()),
            created_at: Utc::now(),
        }
    }

    fn condition_row(id: ConditionId, operator: &str, value: Option<(ValueId, &str)>) -> ConditionRow {
        ConditionRow {
            id,
            rule_id: 3,
            node_id: 10,
            operator: operator.to_string(),
            value_id: value.map(|(id, _)| id),
            node_name: Some("Source Format".to_string()),
            value_name: value.map(|(_, name)| name.to_string()),
        }
    }

    #[test]
    fn rows_assemble_into_rule() {
        let conditions = vec![
            condition_row(1, "=", Some((5, "Unstructured"))).into(),
            condition_row(2, "is not null", None).into(),
        ];
        let rule = row("Error").into_rule(conditions);
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.conditions[1].operator, Operator::IsNotNull);

        let summary = RuleSummary::from(&rule);
        assert_eq!(
            summary.conditions,
            "Source Format = Unstructured AND Source Format IS NOT NULL"
        );
    }

    #[test]
    fn unknown_stored_severity_falls_back() {
        let rule = row("Critical").into_rule(Vec::new());
        assert_eq!(rule.severity, Severity::Warning);
    }

    #[test]
    fn stored_angle_brackets_read_as_not_eq() {
        let c: Condition = condition_row(1, "<>", Some((7, "Yes"))).into();
        assert_eq!(c.operator, Operator::NotEq);
        assert_eq!(c.describe(), "Source Format != Yes");
    }
}
