//! Per-user, per-data-source preference selections.
//!
//! Each (user, data source, node) holds at most one value. Saving a new
//! value for a node replaces the previous one. A data source only exists
//! implicitly, through the selections stored under it.

use chrono::{DateTime, Utc};
use pillars_core::{clean_name, NodeId, PreferenceMap, ValueId};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;

use crate::error::{map_unique_violation, StoreError};
use crate::taxonomy::TaxonomyStore;

// ── Row types ────────────────────────────────────────────────────────

/// One selection joined with the names along its taxonomy path.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PreferenceDetail {
    pub category: String,
    pub subcategory: String,
    pub node_id: NodeId,
    pub node: String,
    pub value_id: ValueId,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SelectionRequest {
    pub value_id: ValueId,
}

/// Target data source for rename and duplicate.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SourceTarget {
    pub target: String,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Trim a (user, data source) pair, rejecting blanks.
pub(crate) fn clean_key(user: &str, data_source: &str) -> Result<(String, String), StoreError> {
    let user = clean_name(user).ok_or_else(|| StoreError::validation("user is required"))?;
    let source =
        clean_name(data_source).ok_or_else(|| StoreError::validation("data source is required"))?;
    Ok((user, source))
}

async fn source_in_use<'e, E: PgExecutor<'e>>(
    exec: E,
    user: &str,
    data_source: &str,
) -> Result<bool, StoreError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM user_node_preference
                        WHERE user_name = $1 AND data_source = $2)",
    )
    .bind(user)
    .bind(data_source)
    .fetch_one(exec)
    .await?;
    Ok(exists)
}

// ── Store ────────────────────────────────────────────────────────────

/// Stateless store for `user_node_preference`.
pub struct PreferenceStore;

impl PreferenceStore {
    /// Data sources the user has at least one selection under.
    pub async fn list_sources(pool: &PgPool, user: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT data_source FROM user_node_preference
             WHERE user_name = $1
             ORDER BY data_source",
        )
        .bind(user.trim())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Node → value for stored selections only.
    pub async fn preference_map<'e, E: PgExecutor<'e>>(
        exec: E,
        user: &str,
        data_source: &str,
    ) -> Result<PreferenceMap, StoreError> {
        let rows = sqlx::query_as::<_, (NodeId, ValueId)>(
            "SELECT node_id, value_id FROM user_node_preference
             WHERE user_name = $1 AND data_source = $2",
        )
        .bind(user)
        .bind(data_source)
        .fetch_all(exec)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Selections with their category/subcategory/node/value names.
    pub async fn list_detailed(
        pool: &PgPool,
        user: &str,
        data_source: &str,
    ) -> Result<Vec<PreferenceDetail>, StoreError> {
        let (user, source) = clean_key(user, data_source)?;
        let rows = sqlx::query_as::<_, PreferenceDetail>(
            "SELECT c.name AS category, s.name AS subcategory,
                    n.id AS node_id, n.name AS node,
                    v.id AS value_id, v.name AS value,
                    p.updated_at
             FROM user_node_preference p
             JOIN pillar_node n ON n.id = p.node_id
             JOIN subcategory s ON s.id = n.subcategory_id
             JOIN category c ON c.id = s.category_id
             JOIN pillar_node_value v ON v.id = p.value_id
             WHERE p.user_name = $1 AND p.data_source = $2
             ORDER BY c.name, s.name, n.name",
        )
        .bind(&user)
        .bind(&source)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Save a selection, replacing any previous value for the node.
    /// The value must be mapped to the node; the mapping stays locked until
    /// the selection is written.
    pub async fn upsert(
        pool: &PgPool,
        user: &str,
        data_source: &str,
        node_id: NodeId,
        value_id: ValueId,
    ) -> Result<(), StoreError> {
        let (user, source) = clean_key(user, data_source)?;
        let mut tx = pool.begin().await?;
        if !TaxonomyStore::lock_mapping(&mut tx, node_id, value_id).await? {
            return Err(StoreError::validation(format!(
                "value {} is not mapped to pillar node {}",
                value_id, node_id
            )));
        }

        sqlx::query(
            "INSERT INTO user_node_preference (user_name, data_source, node_id, value_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_name, data_source, node_id)
             DO UPDATE SET value_id = EXCLUDED.value_id, updated_at = now()",
        )
        .bind(&user)
        .bind(&source)
        .bind(node_id)
        .bind(value_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove one selection. Returns whether anything was stored.
    pub async fn clear(
        pool: &PgPool,
        user: &str,
        data_source: &str,
        node_id: NodeId,
    ) -> Result<bool, StoreError> {
        let (user, source) = clean_key(user, data_source)?;
        let result = sqlx::query(
            "DELETE FROM user_node_preference
             WHERE user_name = $1 AND data_source = $2 AND node_id = $3",
        )
        .bind(&user)
        .bind(&source)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every selection under a data source.
    pub async fn clear_all(pool: &PgPool, user: &str, data_source: &str) -> Result<u64, StoreError> {
        let (user, source) = clean_key(user, data_source)?;
        let result = sqlx::query(
            "DELETE FROM user_node_preference WHERE user_name = $1 AND data_source = $2",
        )
        .bind(&user)
        .bind(&source)
        .execute(pool)
        .await?;
        info!(user = %user, data_source = %source, removed = result.rows_affected(), "data source cleared");
        Ok(result.rows_affected())
    }

    /// Move every selection from `from` to `to`. Fails if `to` already has
    /// selections or `from` has none.
    pub async fn rename_source(
        pool: &PgPool,
        user: &str,
        from: &str,
        to: &str,
    ) -> Result<u64, StoreError> {
        let (user, from) = clean_key(user, from)?;
        let (_, to) = clean_key(&user, to)?;
        if from == to {
            return Err(StoreError::validation("new data source name is unchanged"));
        }

        let mut tx = pool.begin().await?;
        if source_in_use(&mut *tx, &user, &to).await? {
            return Err(StoreError::Duplicate {
                entity: "data source",
                name: to,
            });
        }
        let result = sqlx::query(
            "UPDATE user_node_preference SET data_source = $3
             WHERE user_name = $1 AND data_source = $2",
        )
        .bind(&user)
        .bind(&from)
        .bind(&to)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "data source", &to))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("data source", &from));
        }
        tx.commit().await?;

        info!(user = %user, from = %from, to = %to, moved = result.rows_affected(), "data source renamed");
        Ok(result.rows_affected())
    }

    /// Copy every selection from `from` into `to`, overwriting per node.
    pub async fn duplicate_source(
        pool: &PgPool,
        user: &str,
        from: &str,
        to: &str,
    ) -> Result<u64, StoreError> {
        let (user, from) = clean_key(user, from)?;
        let (_, to) = clean_key(&user, to)?;
        if from == to {
            return Err(StoreError::validation("cannot duplicate a data source onto itself"));
        }

        let mut tx = pool.begin().await?;
        if !source_in_use(&mut *tx, &user, &from).await? {
            return Err(StoreError::not_found("data source", &from));
        }
        let result = sqlx::query(
            "INSERT INTO user_node_preference (user_name, data_source, node_id, value_id)
             SELECT user_name, $3, node_id, value_id
             FROM user_node_preference
             WHERE user_name = $1 AND data_source = $2
             ON CONFLICT (user_name, data_source, node_id)
             DO UPDATE SET value_id = EXCLUDED.value_id, updated_at = now()",
        )
        .bind(&user)
        .bind(&from)
        .bind(&to)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(user = %user, from = %from, to = %to, copied = result.rows_affected(), "data source duplicated");
        Ok(result.rows_affected())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_key_trims_and_rejects_blank() {
        assert_eq!(
            clean_key(" alice ", " Salesforce API ").unwrap(),
            ("alice".to_string(), "Salesforce API".to_string())
        );
        assert_eq!(clean_key("", "x").unwrap_err().to_string(), "user is required");
        assert_eq!(clean_key("a", "  ").unwrap_err().to_string(), "data source is required");
    }

    #[test]
    fn request_bodies_deserialize() {
        let sel: SelectionRequest = serde_json::from_str(r#"{"value_id":5}"#).unwrap();
        assert_eq!(sel.value_id, 5);
        let target: SourceTarget = serde_json::from_str(r#"{"target":"Workday API"}"#).unwrap();
        assert_eq!(target.target, "Workday API");
    }
}
