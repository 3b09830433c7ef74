//! CRUD operations for the taxonomy tables.
//!
//! [`TaxonomyStore`] is a stateless unit struct with async methods that take
//! a `&PgPool`. Names are trimmed before they are stored and blank
//! descriptions become NULL. Deletes are refused while children or mappings
//! still reference the row.

use chrono::{DateTime, Utc};
use pillars_core::{clean_name, clean_optional, CategoryId, NodeId, SubcategoryId, ValueId};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::info;

use crate::error::{is_fk_violation, map_fk_violation, map_unique_violation, StoreError};

// ── Row types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PillarNode {
    pub id: NodeId,
    pub subcategory_id: SubcategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PillarValue {
    pub id: ValueId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A value plus the number of nodes it is mapped to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct ValueSummary {
    pub id: ValueId,
    pub name: String,
    pub description: Option<String>,
    pub mapping_count: i64,
}

/// Outcome of a bulk mapping insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct MappingChange {
    pub inserted: u64,
    /// Value ids whose pair already existed, in request order.
    pub skipped: Vec<ValueId>,
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct NameRequest {
    pub name: String,
}

/// Body for creating or updating a pillar node or a value.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DescribedRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MappingRequest {
    pub value_ids: Vec<ValueId>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn required_name(raw: &str, what: &str) -> Result<String, StoreError> {
    clean_name(raw).ok_or_else(|| StoreError::validation(format!("{} name is required", what)))
}

/// `%term%` for ILIKE, with LIKE metacharacters escaped. Blank → `None`.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

async fn count<'e, E: PgExecutor<'e>>(exec: E, sql: &str, id: i64) -> Result<i64, StoreError> {
    let n = sqlx::query_scalar::<_, i64>(sql).bind(id).fetch_one(exec).await?;
    Ok(n)
}

// ── Store ────────────────────────────────────────────────────────────

/// Stateless CRUD store for categories, subcategories, nodes and values.
pub struct TaxonomyStore;

impl TaxonomyStore {
    // ── Categories ──

    pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM category ORDER BY name",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_category(pool: &PgPool, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Whether a category with this name exists (both sides trimmed).
    pub async fn category_exists(pool: &PgPool, name: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM category WHERE btrim(name) = $1)",
        )
        .bind(name.trim())
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn create_category(pool: &PgPool, name: &str) -> Result<Category, StoreError> {
        let name = required_name(name, "category")?;
        let row = sqlx::query_as::<_, Category>(
            "INSERT INTO category (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(&name)
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, "category", &name))?;
        info!(category_id = row.id, name = %row.name, "category created");
        Ok(row)
    }

    /// Delete a category. Refused while it still has subcategories.
    pub async fn delete_category(pool: &PgPool, id: CategoryId) -> Result<(), StoreError> {
        let children = count(
            pool,
            "SELECT COUNT(*) FROM subcategory WHERE category_id = $1",
            id,
        )
        .await?;
        if children > 0 {
            return Err(StoreError::InUse(format!(
                "category {} still has {} subcategories",
                id, children
            )));
        }

        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| map_fk_violation(e, || format!("category {} is still referenced", id)))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        Ok(())
    }

    // ── Subcategories ──

    pub async fn list_subcategories(
        pool: &PgPool,
        category_id: CategoryId,
    ) -> Result<Vec<Subcategory>, StoreError> {
        let rows = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name, created_at
             FROM subcategory
             WHERE category_id = $1
             ORDER BY name",
        )
        .bind(category_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_subcategory(
        pool: &PgPool,
        id: SubcategoryId,
    ) -> Result<Option<Subcategory>, StoreError> {
        let row = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name, created_at FROM subcategory WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Create a subcategory. Names are unique within their category.
    pub async fn create_subcategory(
        pool: &PgPool,
        category_id: CategoryId,
        name: &str,
    ) -> Result<Subcategory, StoreError> {
        let name = required_name(name, "subcategory")?;
        if Self::get_category(pool, category_id).await?.is_none() {
            return Err(StoreError::not_found("category", category_id));
        }

        let row = sqlx::query_as::<_, Subcategory>(
            "INSERT INTO subcategory (category_id, name) VALUES ($1, $2)
             RETURNING id, category_id, name, created_at",
        )
        .bind(category_id)
        .bind(&name)
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, "subcategory", &name))?;
        info!(subcategory_id = row.id, category_id, "subcategory created");
        Ok(row)
    }

    /// Delete a subcategory. Refused while pillar nodes remain under it.
    pub async fn delete_subcategory(pool: &PgPool, id: SubcategoryId) -> Result<(), StoreError> {
        let nodes = count(
            pool,
            "SELECT COUNT(*) FROM pillar_node WHERE subcategory_id = $1",
            id,
        )
        .await?;
        if nodes > 0 {
            return Err(StoreError::InUse(format!(
                "subcategory {} still has {} pillar nodes",
                id, nodes
            )));
        }

        let result = sqlx::query("DELETE FROM subcategory WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| map_fk_violation(e, || format!("subcategory {} is still referenced", id)))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("subcategory", id));
        }
        Ok(())
    }

    // ── Pillar nodes ──

    pub async fn list_nodes(
        pool: &PgPool,
        subcategory_id: SubcategoryId,
    ) -> Result<Vec<PillarNode>, StoreError> {
        let rows = sqlx::query_as::<_, PillarNode>(
            "SELECT id, subcategory_id, name, description, created_at
             FROM pillar_node
             WHERE subcategory_id = $1
             ORDER BY name",
        )
        .bind(subcategory_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_node(pool: &PgPool, id: NodeId) -> Result<Option<PillarNode>, StoreError> {
        let row = sqlx::query_as::<_, PillarNode>(
            "SELECT id, subcategory_id, name, description, created_at
             FROM pillar_node WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Create a pillar node. Names are unique within their subcategory.
    pub async fn create_node(
        pool: &PgPool,
        subcategory_id: SubcategoryId,
        req: &DescribedRequest,
    ) -> Result<PillarNode, StoreError> {
        let name = required_name(&req.name, "pillar node")?;
        if Self::get_subcategory(pool, subcategory_id).await?.is_none() {
            return Err(StoreError::not_found("subcategory", subcategory_id));
        }

        let row = sqlx::query_as::<_, PillarNode>(
            "INSERT INTO pillar_node (subcategory_id, name, description) VALUES ($1, $2, $3)
             RETURNING id, subcategory_id, name, description, created_at",
        )
        .bind(subcategory_id)
        .bind(&name)
        .bind(clean_optional(req.description.as_deref()))
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, "pillar node", &name))?;
        info!(node_id = row.id, subcategory_id, "pillar node created");
        Ok(row)
    }

    /// Rename / re-describe a node. Keeping its own name is not a conflict.
    pub async fn update_node(
        pool: &PgPool,
        id: NodeId,
        req: &DescribedRequest,
    ) -> Result<PillarNode, StoreError> {
        let name = required_name(&req.name, "pillar node")?;
        let row = sqlx::query_as::<_, PillarNode>(
            "UPDATE pillar_node SET name = $2, description = $3
             WHERE id = $1
             RETURNING id, subcategory_id, name, description, created_at",
        )
        .bind(id)
        .bind(&name)
        .bind(clean_optional(req.description.as_deref()))
        .fetch_optional(pool)
        .await
        .map_err(|e| map_unique_violation(e, "pillar node", &name))?;
        row.ok_or_else(|| StoreError::not_found("pillar node", id))
    }

    /// Delete a node. Refused while values are mapped to it.
    pub async fn delete_node(pool: &PgPool, id: NodeId) -> Result<(), StoreError> {
        let mapped = count(
            pool,
            "SELECT COUNT(*) FROM pillar_node_value_mapping WHERE node_id = $1",
            id,
        )
        .await?;
        if mapped > 0 {
            return Err(StoreError::InUse(format!(
                "pillar node {} has {} mapped values; remove the mappings first",
                id, mapped
            )));
        }

        let result = sqlx::query("DELETE FROM pillar_node WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                map_fk_violation(e, || {
                    format!("pillar node {} is used by preferences or rule conditions", id)
                })
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("pillar node", id));
        }
        Ok(())
    }

    // ── Values ──

    /// All values with their mapping counts, optionally filtered by a
    /// case-insensitive substring of name or description.
    pub async fn list_values(
        pool: &PgPool,
        search: Option<&str>,
    ) -> Result<Vec<ValueSummary>, StoreError> {
        let rows = sqlx::query_as::<_, ValueSummary>(
            "SELECT v.id, v.name, v.description, COUNT(m.node_id) AS mapping_count
             FROM pillar_node_value v
             LEFT JOIN pillar_node_value_mapping m ON m.value_id = v.id
             WHERE $1::text IS NULL OR v.name ILIKE $1 OR v.description ILIKE $1
             GROUP BY v.id, v.name, v.description
             ORDER BY v.name",
        )
        .bind(like_pattern(search))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_value(pool: &PgPool, id: ValueId) -> Result<Option<PillarValue>, StoreError> {
        let row = sqlx::query_as::<_, PillarValue>(
            "SELECT id, name, description, created_at FROM pillar_node_value WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Create a value. Value names are globally unique.
    pub async fn create_value(
        pool: &PgPool,
        req: &DescribedRequest,
    ) -> Result<PillarValue, StoreError> {
        let name = required_name(&req.name, "value")?;
        let row = sqlx::query_as::<_, PillarValue>(
            "INSERT INTO pillar_node_value (name, description) VALUES ($1, $2)
             RETURNING id, name, description, created_at",
        )
        .bind(&name)
        .bind(clean_optional(req.description.as_deref()))
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, "value", &name))?;
        info!(value_id = row.id, "value created");
        Ok(row)
    }

    pub async fn update_value(
        pool: &PgPool,
        id: ValueId,
        req: &DescribedRequest,
    ) -> Result<PillarValue, StoreError> {
        let name = required_name(&req.name, "value")?;
        let row = sqlx::query_as::<_, PillarValue>(
            "UPDATE pillar_node_value SET name = $2, description = $3
             WHERE id = $1
             RETURNING id, name, description, created_at",
        )
        .bind(id)
        .bind(&name)
        .bind(clean_optional(req.description.as_deref()))
        .fetch_optional(pool)
        .await
        .map_err(|e| map_unique_violation(e, "value", &name))?;
        row.ok_or_else(|| StoreError::not_found("value", id))
    }

    /// Delete a value. Refused while it is mapped to any node.
    pub async fn delete_value(pool: &PgPool, id: ValueId) -> Result<(), StoreError> {
        let mapped = count(
            pool,
            "SELECT COUNT(*) FROM pillar_node_value_mapping WHERE value_id = $1",
            id,
        )
        .await?;
        if mapped > 0 {
            return Err(StoreError::InUse(format!(
                "value {} is mapped to {} nodes; unmap it first",
                id, mapped
            )));
        }

        let result = sqlx::query("DELETE FROM pillar_node_value WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                map_fk_violation(e, || {
                    format!("value {} is used by preferences or rule conditions", id)
                })
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("value", id));
        }
        Ok(())
    }

    // ── Mappings ──

    /// Values mapped to `node_id`, optionally filtered.
    pub async fn mapped_values(
        pool: &PgPool,
        node_id: NodeId,
        search: Option<&str>,
    ) -> Result<Vec<PillarValue>, StoreError> {
        let rows = sqlx::query_as::<_, PillarValue>(
            "SELECT v.id, v.name, v.description, v.created_at
             FROM pillar_node_value_mapping m
             JOIN pillar_node_value v ON v.id = m.value_id
             WHERE m.node_id = $1
               AND ($2::text IS NULL OR v.name ILIKE $2 OR v.description ILIKE $2)
             ORDER BY v.name",
        )
        .bind(node_id)
        .bind(like_pattern(search))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Values not yet mapped to `node_id`, optionally filtered.
    pub async fn available_values(
        pool: &PgPool,
        node_id: NodeId,
        search: Option<&str>,
    ) -> Result<Vec<PillarValue>, StoreError> {
        let rows = sqlx::query_as::<_, PillarValue>(
            "SELECT v.id, v.name, v.description, v.created_at
             FROM pillar_node_value v
             WHERE NOT EXISTS (
                     SELECT 1 FROM pillar_node_value_mapping m
                     WHERE m.node_id = $1 AND m.value_id = v.id)
               AND ($2::text IS NULL OR v.name ILIKE $2 OR v.description ILIKE $2)
             ORDER BY v.name",
        )
        .bind(node_id)
        .bind(like_pattern(search))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Map each of `value_ids` to `node_id`. Existing pairs are skipped.
    /// All-or-nothing: an unknown node or value rolls the batch back.
    pub async fn add_mappings(
        pool: &PgPool,
        node_id: NodeId,
        value_ids: &[ValueId],
    ) -> Result<MappingChange, StoreError> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;
        let mut skipped = Vec::new();
        for &value_id in value_ids {
            let result = sqlx::query(
                "INSERT INTO pillar_node_value_mapping (node_id, value_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(node_id)
            .bind(value_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_fk_violation(&e) {
                    StoreError::validation(format!(
                        "pillar node {} or value {} does not exist",
                        node_id, value_id
                    ))
                } else {
                    StoreError::from(e)
                }
            })?;
            if result.rows_affected() == 0 {
                skipped.push(value_id);
            } else {
                inserted += result.rows_affected();
            }
        }
        tx.commit().await?;

        info!(node_id, inserted, skipped = skipped.len(), "mappings added");
        Ok(MappingChange { inserted, skipped })
    }

    /// Remove the given mappings from `node_id`. Returns how many existed.
    pub async fn remove_mappings(
        pool: &PgPool,
        node_id: NodeId,
        value_ids: &[ValueId],
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM pillar_node_value_mapping WHERE node_id = $1 AND value_id = ANY($2)",
        )
        .bind(node_id)
        .bind(value_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Like [`TaxonomyStore::is_mapped`], but share-locks the mapping row
    /// until the caller's transaction ends, so a concurrent unmap waits
    /// instead of slipping in before the caller's write.
    pub async fn lock_mapping(
        conn: &mut PgConnection,
        node_id: NodeId,
        value_id: ValueId,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query_scalar::<_, NodeId>(
            "SELECT node_id FROM pillar_node_value_mapping
             WHERE node_id = $1 AND value_id = $2
             FOR SHARE",
        )
        .bind(node_id)
        .bind(value_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Whether `value_id` is a selectable value for `node_id`.
    pub async fn is_mapped<'e, E: PgExecutor<'e>>(
        exec: E,
        node_id: NodeId,
        value_id: ValueId,
    ) -> Result<bool, StoreError> {
        let mapped = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pillar_node_value_mapping
                            WHERE node_id = $1 AND value_id = $2)",
        )
        .bind(node_id)
        .bind(value_id)
        .fetch_one(exec)
        .await?;
        Ok(mapped)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
