//! Read-side interfaces the evaluator pulls its inputs through.
//!
//! The engine never caches: every evaluation calls both sources afresh.

use async_trait::async_trait;
use pillars_core::PreferenceMap;

use crate::schema::Rule;

/// Supplies a user's stored selections for one data source.
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Node → value for stored selections only; unselected nodes are absent.
    async fn preference_map(
        &self,
        user: &str,
        data_source: &str,
    ) -> Result<PreferenceMap, Self::Error>;
}

/// Supplies every rule (active or not) with its ordered conditions.
#[async_trait]
pub trait RuleSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Rules in a stable, total order (newest first, then highest id first).
    async fn rules_with_conditions(&self) -> Result<Vec<Rule>, Self::Error>;
}
