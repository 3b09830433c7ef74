//! PostgreSQL persistence for the pillar taxonomy, user preferences and
//! warning rules.
//!
//! Each table group has a stateless store (`TaxonomyStore`,
//! `PreferenceStore`, `RuleStore`) whose async methods take a `&PgPool`.
//! [`PgSource`] adapts the stores to the evaluator's source traits.

pub mod db;
pub mod error;
pub mod preferences;
pub mod rules;
pub mod source;
pub mod taxonomy;

pub use db::{connect_lazy, init_pg_pool, run_migrations};
pub use error::StoreError;
pub use preferences::PreferenceStore;
pub use rules::RuleStore;
pub use source::PgSource;
pub use taxonomy::TaxonomyStore;
