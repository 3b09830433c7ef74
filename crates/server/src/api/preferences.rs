//! Per-user data sources and their node selections.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pillars_store::preferences::{PreferenceDetail, SelectionRequest, SourceTarget};
use pillars_store::PreferenceStore;

use crate::state::AppState;

use super::common::{store_err, Affected, ApiResult, ErrorResponse};

#[utoipa::path(
    get,
    path = "/users/{user}/sources",
    tag = "Preferences",
    params(("user" = String, Path, description = "User name")),
    responses((status = 200, description = "Data sources with at least one selection", body = Vec<String>))
)]
pub async fn list_sources(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let sources = PreferenceStore::list_sources(&state.pg_pool, &user)
        .await
        .map_err(store_err)?;
    Ok(Json(sources))
}

#[utoipa::path(
    get,
    path = "/users/{user}/sources/{source}/preferences",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Data source name")
    ),
    responses((status = 200, description = "Selections with taxonomy names", body = Vec<PreferenceDetail>))
)]
pub async fn list_preferences(
    State(state): State<Arc<AppState>>,
    Path((user, source)): Path<(String, String)>,
) -> ApiResult<Json<Vec<PreferenceDetail>>> {
    let rows = PreferenceStore::list_detailed(&state.pg_pool, &user, &source)
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    delete,
    path = "/users/{user}/sources/{source}/preferences",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Data source name")
    ),
    responses((status = 200, description = "Number of selections removed", body = Affected))
)]
pub async fn clear_source(
    State(state): State<Arc<AppState>>,
    Path((user, source)): Path<(String, String)>,
) -> ApiResult<Json<Affected>> {
    let affected = PreferenceStore::clear_all(&state.pg_pool, &user, &source)
        .await
        .map_err(store_err)?;
    Ok(Json(Affected { affected }))
}

#[utoipa::path(
    put,
    path = "/users/{user}/sources/{source}/preferences/{node_id}",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Data source name"),
        ("node_id" = i64, Path, description = "Pillar node ID")
    ),
    request_body = SelectionRequest,
    responses(
        (status = 204, description = "Selection saved"),
        (status = 400, description = "Value is not mapped to the node", body = ErrorResponse)
    )
)]
pub async fn save_preference(
    State(state): State<Arc<AppState>>,
    Path((user, source, node_id)): Path<(String, String, i64)>,
    Json(req): Json<SelectionRequest>,
) -> ApiResult<StatusCode> {
    PreferenceStore::upsert(&state.pg_pool, &user, &source, node_id, req.value_id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/users/{user}/sources/{source}/preferences/{node_id}",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Data source name"),
        ("node_id" = i64, Path, description = "Pillar node ID")
    ),
    responses((status = 204, description = "Selection cleared (or was not set)"))
)]
pub async fn clear_preference(
    State(state): State<Arc<AppState>>,
    Path((user, source, node_id)): Path<(String, String, i64)>,
) -> ApiResult<StatusCode> {
    PreferenceStore::clear(&state.pg_pool, &user, &source, node_id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{user}/sources/{source}/rename",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Current data source name")
    ),
    request_body = SourceTarget,
    responses(
        (status = 200, description = "Number of selections moved", body = Affected),
        (status = 404, description = "Source has no selections", body = ErrorResponse),
        (status = 409, description = "Target already has selections", body = ErrorResponse)
    )
)]
pub async fn rename_source(
    State(state): State<Arc<AppState>>,
    Path((user, source)): Path<(String, String)>,
    Json(req): Json<SourceTarget>,
) -> ApiResult<Json<Affected>> {
    let affected = PreferenceStore::rename_source(&state.pg_pool, &user, &source, &req.target)
        .await
        .map_err(store_err)?;
    Ok(Json(Affected { affected }))
}

#[utoipa::path(
    post,
    path = "/users/{user}/sources/{source}/duplicate",
    tag = "Preferences",
    params(
        ("user" = String, Path, description = "User name"),
        ("source" = String, Path, description = "Data source to copy from")
    ),
    request_body = SourceTarget,
    responses(
        (status = 200, description = "Number of selections copied", body = Affected),
        (status = 404, description = "Source has no selections", body = ErrorResponse)
    )
)]
pub async fn duplicate_source(
    State(state): State<Arc<AppState>>,
    Path((user, source)): Path<(String, String)>,
    Json(req): Json<SourceTarget>,
) -> ApiResult<Json<Affected>> {
    let affected = PreferenceStore::duplicate_source(&state.pg_pool, &user, &source, &req.target)
        .await
        .map_err(store_err)?;
    Ok(Json(Affected { affected }))
}
