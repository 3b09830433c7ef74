//! Store error type shared by every table module.

use std::fmt::Display;

use pillars_rules::validation::ValidationError;
use tracing::error;

/// Errors from taxonomy, preference and rule store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Input rejected before reaching the database.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("duplicate {entity}: '{name}' already exists")]
    Duplicate { entity: &'static str, name: String },

    /// Delete refused because dependent rows still reference the target.
    #[error("{0}")]
    InUse(String),

    /// The pool could not hand out a working connection.
    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Map to an HTTP status code for API responses.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Duplicate { .. } | Self::InUse(_) => 409,
            Self::Unavailable(_) => 503,
            Self::Database(_) | Self::Migrate(_) => 500,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_connectivity(&e) {
            error!("database unavailable: {}", e);
            Self::Unavailable(e)
        } else {
            error!("store database error: {}", e);
            Self::Database(e)
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

fn is_connectivity(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Map a PostgreSQL unique violation (23505) to `Duplicate`.
pub(crate) fn map_unique_violation(e: sqlx::Error, entity: &'static str, name: &str) -> StoreError {
    if db_code(&e).as_deref() == Some("23505") {
        return StoreError::Duplicate {
            entity,
            name: name.to_string(),
        };
    }
    StoreError::from(e)
}

pub(crate) fn is_fk_violation(e: &sqlx::Error) -> bool {
    db_code(e).as_deref() == Some("23503")
}

/// Map a PostgreSQL foreign-key violation (23503) to `InUse` with `msg`.
pub(crate) fn map_fk_violation(e: sqlx::Error, msg: impl FnOnce() -> String) -> StoreError {
    if is_fk_violation(&e) {
        return StoreError::InUse(msg());
    }
    StoreError::from(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(StoreError::validation("x").status_code(), 400);
        assert_eq!(StoreError::not_found("rule", 7).status_code(), 404);
        assert_eq!(
            StoreError::Duplicate {
                entity: "category",
                name: "Data".to_string()
            }
            .status_code(),
            409
        );
        assert_eq!(StoreError::InUse("busy".to_string()).status_code(), 409);
        assert_eq!(StoreError::from(sqlx::Error::PoolTimedOut).status_code(), 503);
        assert_eq!(StoreError::from(sqlx::Error::RowNotFound).status_code(), 500);
    }

    #[test]
    fn messages_name_the_subject() {
        assert_eq!(StoreError::not_found("pillar node", 42).to_string(), "pillar node not found: 42");
        let dup = map_unique_violation(sqlx::Error::RowNotFound, "value", "Unstructured");
        assert!(matches!(dup, StoreError::Database(_)));
    }

    #[test]
    fn validation_errors_convert() {
        let err: StoreError = ValidationError::MissingName.into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "rule name is required");
    }
}
