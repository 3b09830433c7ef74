//! Evaluation error types.

/// Why an evaluation produced no hit list at all.
///
/// This is distinct from an empty hit list, which means no rule fired.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A required argument (user or data source) was blank.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A rule or preference lookup failed; no partial results are returned.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl EvaluationError {
    pub(crate) fn unavailable<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StoreUnavailable(Box::new(e))
    }
}

/// Result alias for evaluation.
pub type Result<T> = std::result::Result<T, EvaluationError>;
