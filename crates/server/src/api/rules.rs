//! Warning rule and condition CRUD.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pillars_rules::schema::{Condition, Rule};
use pillars_rules::validation::{ConditionDraft, RuleDraft, RuleMetaDraft};
use pillars_store::rules::RuleSummary;
use pillars_store::RuleStore;
use serde::Serialize;

use crate::state::AppState;

use super::common::{not_found, store_err, ApiResult, ErrorResponse};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ToggleResponse {
    pub id: i64,
    pub is_active: bool,
}

#[utoipa::path(
    get,
    path = "/rules",
    tag = "Warnings",
    responses((status = 200, description = "Rules newest first with condition text", body = Vec<RuleSummary>))
)]
pub async fn list_rules(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<RuleSummary>>> {
    let rows = RuleStore::list_summaries(&state.pg_pool)
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

/// The draft carries metadata and all conditions; nothing is written
/// unless every part is valid.
#[utoipa::path(
    post,
    path = "/rules",
    tag = "Warnings",
    request_body = RuleDraft,
    responses(
        (status = 201, description = "Rule created", body = Rule),
        (status = 400, description = "Invalid draft", body = ErrorResponse)
    )
)]
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RuleDraft>,
) -> ApiResult<(StatusCode, Json<Rule>)> {
    let rule = RuleStore::create(&state.pg_pool, &draft)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

#[utoipa::path(
    get,
    path = "/rules/{id}",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule with conditions", body = Rule),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Rule>> {
    let rule = RuleStore::get(&state.pg_pool, id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| not_found("rule", id))?;
    Ok(Json(rule))
}

#[utoipa::path(
    put,
    path = "/rules/{id}",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Rule ID")),
    request_body = RuleMetaDraft,
    responses(
        (status = 200, description = "Rule updated", body = Rule),
        (status = 400, description = "Invalid metadata", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<RuleMetaDraft>,
) -> ApiResult<Json<Rule>> {
    let rule = RuleStore::update_meta(&state.pg_pool, id, &draft)
        .await
        .map_err(store_err)?;
    Ok(Json(rule))
}

#[utoipa::path(
    delete,
    path = "/rules/{id}",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Rule ID")),
    responses(
        (status = 204, description = "Rule and its conditions deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    RuleStore::delete(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/rules/{id}/toggle",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "New active state", body = ToggleResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ToggleResponse>> {
    let is_active = RuleStore::toggle(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(Json(ToggleResponse { id, is_active }))
}

#[utoipa::path(
    post,
    path = "/rules/{id}/conditions",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Rule ID")),
    request_body = ConditionDraft,
    responses(
        (status = 201, description = "Condition added", body = Condition),
        (status = 400, description = "Invalid condition", body = ErrorResponse),
        (status = 404, description = "Unknown rule", body = ErrorResponse)
    )
)]
pub async fn add_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<ConditionDraft>,
) -> ApiResult<(StatusCode, Json<Condition>)> {
    let condition = RuleStore::add_condition(&state.pg_pool, id, &draft)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(condition)))
}

#[utoipa::path(
    delete,
    path = "/conditions/{id}",
    tag = "Warnings",
    params(("id" = i64, Path, description = "Condition ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    RuleStore::delete_condition(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}
