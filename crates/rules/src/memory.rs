//! In-process rule and preference source.
//!
//! Backs the test suite and callers that keep rules in memory. Rules are returned in
//! store order (newest first, then highest id first) with conditions sorted
//! by id, matching what the PostgreSQL source produces.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use pillars_core::{NodeId, PreferenceMap, ValueId};

use crate::schema::Rule;
use crate::source::{PreferenceSource, RuleSource};

/// Returned by [`MemorySource`] while it is switched offline.
#[derive(Debug, thiserror::Error)]
#[error("in-memory source is offline")]
pub struct MemoryUnavailable;

#[derive(Default)]
struct State {
    rules: Vec<Rule>,
    preferences: HashMap<(String, String), PreferenceMap>,
    offline: bool,
}

#[derive(Default)]
pub struct MemorySource {
    state: RwLock<State>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        let source = Self::new();
        for rule in rules {
            source.put_rule(rule);
        }
        source
    }

    /// Insert or replace a rule by id.
    pub fn put_rule(&self, rule: Rule) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.rules.retain(|r| r.id != rule.id);
        state.rules.push(rule);
    }

    pub fn remove_rule(&self, id: i64) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        state.rules.len() != before
    }

    /// Store a selection, replacing any earlier value for the node.
    pub fn select(&self, user: &str, data_source: &str, node_id: NodeId, value_id: ValueId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .preferences
            .entry((user.to_string(), data_source.to_string()))
            .or_default()
            .insert(node_id, value_id);
    }

    pub fn clear(&self, user: &str, data_source: &str, node_id: NodeId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(prefs) = state
            .preferences
            .get_mut(&(user.to_string(), data_source.to_string()))
        {
            prefs.remove(&node_id);
        }
    }

    /// Make every subsequent read fail with [`MemoryUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).offline = offline;
    }
}

#[async_trait]
impl PreferenceSource for MemorySource {
    type Error = MemoryUnavailable;

    async fn preference_map(
        &self,
        user: &str,
        data_source: &str,
    ) -> Result<PreferenceMap, Self::Error> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.offline {
            return Err(MemoryUnavailable);
        }
        Ok(state
            .preferences
            .get(&(user.to_string(), data_source.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RuleSource for MemorySource {
    type Error = MemoryUnavailable;

    async fn rules_with_conditions(&self) -> Result<Vec<Rule>, Self::Error> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.offline {
            return Err(MemoryUnavailable);
        }
        let mut rules = state.rules.clone();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        for rule in &mut rules {
            rule.conditions.sort_by_key(|c| c.id);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Severity;
    use chrono::{TimeZone, Utc};

    fn rule(id: i64, day: u32) -> Rule {
        Rule {
            id,
            name: format!("R{}", id),
            message: "m".to_string(),
            severity: Severity::Info,
            is_active: true,
            data_source_filter: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            conditions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn rules_come_back_newest_first_then_id_desc() {
        let source = MemorySource::with_rules(vec![rule(1, 1), rule(2, 5), rule(3, 5)]);
        let ids: Vec<_> = source
            .rules_with_conditions()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn selections_are_per_user_and_source() {
        let source = MemorySource::new();
        source.select("alice", "Salesforce API", 10, 5);
        source.select("alice", "Salesforce API", 10, 6);
        source.select("alice", "Workday API", 10, 7);

        let prefs = source.preference_map("alice", "Salesforce API").await.unwrap();
        assert_eq!(prefs.get(&10), Some(&6));
        assert!(source.preference_map("bob", "Salesforce API").await.unwrap().is_empty());

        source.clear("alice", "Salesforce API", 10);
        assert!(source.preference_map("alice", "Salesforce API").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_fails_reads() {
        let source = MemorySource::new();
        source.set_offline(true);
        assert!(source.preference_map("a", "b").await.is_err());
        assert!(source.rules_with_conditions().await.is_err());
    }
}
