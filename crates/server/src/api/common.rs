//! Shared error shape and helpers for every endpoint module.

use axum::http::StatusCode;
use axum::Json;
use pillars_rules::EvaluationError;
use pillars_store::StoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

/// Map a store error to its HTTP status.
pub(crate) fn store_err(e: StoreError) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error(status, e.to_string())
}

pub(crate) fn eval_err(e: EvaluationError) -> ApiError {
    match e {
        EvaluationError::InvalidInput(_) => error(StatusCode::BAD_REQUEST, e.to_string()),
        EvaluationError::StoreUnavailable(_) => {
            error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub(crate) fn not_found(resource: &str, id: i64) -> ApiError {
    error(StatusCode::NOT_FOUND, format!("{} not found: {}", resource, id))
}

/// `?search=` query string shared by the value listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
}

/// Row count returned by bulk deletes and copies.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Affected {
    pub affected: u64,
}
