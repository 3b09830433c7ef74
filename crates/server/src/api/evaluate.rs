//! Warning evaluation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pillars_rules::schema::RuleHit;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

use super::common::{eval_err, ApiResult, ErrorResponse};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EvaluateRequest {
    pub user: String,
    pub data_source: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EvaluateResponse {
    /// Fired rules in rule-list order. Empty when nothing fired.
    pub hits: Vec<RuleHit>,
}

/// POST /evaluate -- run every warning rule against a user's selections.
#[utoipa::path(
    post,
    path = "/evaluate",
    tag = "Warnings",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Rules that fired", body = EvaluateResponse),
        (status = 400, description = "Blank user or data source", body = ErrorResponse),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> ApiResult<Json<EvaluateResponse>> {
    let hits = state
        .engine
        .evaluate(&req.user, &req.data_source)
        .await
        .map_err(eval_err)?;
    info!(user = %req.user.trim(), data_source = %req.data_source.trim(), hits = hits.len(), "warnings evaluated");
    Ok(Json(EvaluateResponse { hits }))
}
