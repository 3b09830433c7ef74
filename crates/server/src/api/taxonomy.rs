//! Category, subcategory, pillar node, value and mapping endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pillars_store::taxonomy::{
    Category, DescribedRequest, MappingChange, MappingRequest, NameRequest, PillarNode,
    PillarValue, Subcategory, ValueSummary,
};
use pillars_store::TaxonomyStore;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::common::{not_found, store_err, Affected, ApiResult, ErrorResponse, SearchQuery};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExistsQuery {
    pub name: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExistsResponse {
    pub exists: bool,
}

// ── Categories ───────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Taxonomy",
    responses((status = 200, description = "Categories ordered by name", body = Vec<Category>))
)]
pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Category>>> {
    let rows = TaxonomyStore::list_categories(&state.pg_pool)
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/categories/exists",
    tag = "Taxonomy",
    params(ExistsQuery),
    responses((status = 200, description = "Whether the trimmed name is taken", body = ExistsResponse))
)]
pub async fn category_exists(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ExistsQuery>,
) -> ApiResult<Json<ExistsResponse>> {
    let exists = TaxonomyStore::category_exists(&state.pg_pool, &q.name)
        .await
        .map_err(store_err)?;
    Ok(Json(ExistsResponse { exists }))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "Taxonomy",
    request_body = NameRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Blank name", body = ErrorResponse),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let row = TaxonomyStore::create_category(&state.pg_pool, &req.name)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Still has subcategories", body = ErrorResponse)
    )
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    TaxonomyStore::delete_category(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Subcategories ────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/categories/{id}/subcategories",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Category ID")),
    responses((status = 200, description = "Subcategories of the category", body = Vec<Subcategory>))
)]
pub async fn list_subcategories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Subcategory>>> {
    let rows = TaxonomyStore::list_subcategories(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/categories/{id}/subcategories",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Subcategory created", body = Subcategory),
        (status = 404, description = "Unknown category", body = ErrorResponse),
        (status = 409, description = "Name already used in this category", body = ErrorResponse)
    )
)]
pub async fn create_subcategory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<NameRequest>,
) -> ApiResult<(StatusCode, Json<Subcategory>)> {
    let row = TaxonomyStore::create_subcategory(&state.pg_pool, id, &req.name)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    delete,
    path = "/subcategories/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Subcategory ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Still has pillar nodes", body = ErrorResponse)
    )
)]
pub async fn delete_subcategory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    TaxonomyStore::delete_subcategory(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Pillar nodes ─────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/subcategories/{id}/nodes",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Subcategory ID")),
    responses((status = 200, description = "Pillar nodes of the subcategory", body = Vec<PillarNode>))
)]
pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<PillarNode>>> {
    let rows = TaxonomyStore::list_nodes(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/subcategories/{id}/nodes",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Subcategory ID")),
    request_body = DescribedRequest,
    responses(
        (status = 201, description = "Pillar node created", body = PillarNode),
        (status = 404, description = "Unknown subcategory", body = ErrorResponse),
        (status = 409, description = "Name already used in this subcategory", body = ErrorResponse)
    )
)]
pub async fn create_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<DescribedRequest>,
) -> ApiResult<(StatusCode, Json<PillarNode>)> {
    let row = TaxonomyStore::create_node(&state.pg_pool, id, &req)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    get,
    path = "/nodes/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Pillar node ID")),
    responses(
        (status = 200, description = "Pillar node", body = PillarNode),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PillarNode>> {
    let row = TaxonomyStore::get_node(&state.pg_pool, id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| not_found("pillar node", id))?;
    Ok(Json(row))
}

#[utoipa::path(
    put,
    path = "/nodes/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Pillar node ID")),
    request_body = DescribedRequest,
    responses(
        (status = 200, description = "Pillar node updated", body = PillarNode),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Name already used in this subcategory", body = ErrorResponse)
    )
)]
pub async fn update_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<DescribedRequest>,
) -> ApiResult<Json<PillarNode>> {
    let row = TaxonomyStore::update_node(&state.pg_pool, id, &req)
        .await
        .map_err(store_err)?;
    Ok(Json(row))
}

#[utoipa::path(
    delete,
    path = "/nodes/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Pillar node ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Values still mapped", body = ErrorResponse)
    )
)]
pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    TaxonomyStore::delete_node(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Mappings ─────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/nodes/{id}/values",
    tag = "Mappings",
    params(("id" = i64, Path, description = "Pillar node ID"), SearchQuery),
    responses((status = 200, description = "Values mapped to the node", body = Vec<PillarValue>))
)]
pub async fn mapped_values(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PillarValue>>> {
    let rows = TaxonomyStore::mapped_values(&state.pg_pool, id, q.search.as_deref())
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/nodes/{id}/available-values",
    tag = "Mappings",
    params(("id" = i64, Path, description = "Pillar node ID"), SearchQuery),
    responses((status = 200, description = "Values not yet mapped to the node", body = Vec<PillarValue>))
)]
pub async fn available_values(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PillarValue>>> {
    let rows = TaxonomyStore::available_values(&state.pg_pool, id, q.search.as_deref())
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/nodes/{id}/values",
    tag = "Mappings",
    params(("id" = i64, Path, description = "Pillar node ID")),
    request_body = MappingRequest,
    responses(
        (status = 200, description = "Inserted count and the value ids that were already mapped", body = MappingChange),
        (status = 400, description = "Unknown node or value", body = ErrorResponse)
    )
)]
pub async fn add_mappings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MappingRequest>,
) -> ApiResult<Json<MappingChange>> {
    let change = TaxonomyStore::add_mappings(&state.pg_pool, id, &req.value_ids)
        .await
        .map_err(store_err)?;
    Ok(Json(change))
}

#[utoipa::path(
    delete,
    path = "/nodes/{id}/values",
    tag = "Mappings",
    params(("id" = i64, Path, description = "Pillar node ID")),
    request_body = MappingRequest,
    responses((status = 200, description = "Number of mappings removed", body = Affected))
)]
pub async fn remove_mappings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MappingRequest>,
) -> ApiResult<Json<Affected>> {
    let affected = TaxonomyStore::remove_mappings(&state.pg_pool, id, &req.value_ids)
        .await
        .map_err(store_err)?;
    Ok(Json(Affected { affected }))
}

// ── Values ───────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/values",
    tag = "Taxonomy",
    params(SearchQuery),
    responses((status = 200, description = "Values with mapping counts", body = Vec<ValueSummary>))
)]
pub async fn list_values(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ValueSummary>>> {
    let rows = TaxonomyStore::list_values(&state.pg_pool, q.search.as_deref())
        .await
        .map_err(store_err)?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/values",
    tag = "Taxonomy",
    request_body = DescribedRequest,
    responses(
        (status = 201, description = "Value created", body = PillarValue),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    )
)]
pub async fn create_value(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DescribedRequest>,
) -> ApiResult<(StatusCode, Json<PillarValue>)> {
    let row = TaxonomyStore::create_value(&state.pg_pool, &req)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    get,
    path = "/values/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Value ID")),
    responses(
        (status = 200, description = "Value", body = PillarValue),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PillarValue>> {
    let row = TaxonomyStore::get_value(&state.pg_pool, id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| not_found("value", id))?;
    Ok(Json(row))
}

#[utoipa::path(
    put,
    path = "/values/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Value ID")),
    request_body = DescribedRequest,
    responses(
        (status = 200, description = "Value updated", body = PillarValue),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    )
)]
pub async fn update_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<DescribedRequest>,
) -> ApiResult<Json<PillarValue>> {
    let row = TaxonomyStore::update_value(&state.pg_pool, id, &req)
        .await
        .map_err(store_err)?;
    Ok(Json(row))
}

#[utoipa::path(
    delete,
    path = "/values/{id}",
    tag = "Taxonomy",
    params(("id" = i64, Path, description = "Value ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Still mapped or referenced", body = ErrorResponse)
    )
)]
pub async fn delete_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    TaxonomyStore::delete_value(&state.pg_pool, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}
