//! End-to-end evaluation against the in-memory source.
//!
//! Node 10 is "Source Format", node 20 is "Contains PII"; values are plain
//! ids. Scenarios A–E mirror the warning table used in the dashboard docs.

use chrono::{TimeZone, Utc};
use pillars_rules::schema::{Condition, Operator, Rule, Severity};
use pillars_rules::{EvaluationError, MemorySource, RuleEngine};

const USER: &str = "alice";
const SALESFORCE: &str = "Salesforce API";
const WORKDAY: &str = "Workday API";

fn rule(id: i64, conditions: &[(&str, i64, Option<i64>)]) -> Rule {
    Rule {
        id,
        name: format!("R{}", id),
        message: format!("Rule {} fired", id),
        severity: Severity::Warning,
        is_active: true,
        data_source_filter: None,
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        conditions: conditions
            .iter()
            .enumerate()
            .map(|(i, (op, node_id, value_id))| Condition {
                id: id * 100 + i as i64,
                rule_id: id,
                node_id: *node_id,
                operator: Operator::parse(op),
                value_id: *value_id,
                node_name: None,
                value_name: None,
            })
            .collect(),
    }
}

fn engine(rules: Vec<Rule>) -> RuleEngine<MemorySource> {
    RuleEngine::new(MemorySource::with_rules(rules))
}

fn hit_ids(hits: &[pillars_rules::schema::RuleHit]) -> Vec<i64> {
    hits.iter().map(|h| h.rule_id).collect()
}

// ── Scenarios ───────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_eq_without_selection_is_absent() {
    let engine = engine(vec![rule(1, &[("=", 10, Some(5))])]);
    let hits = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn scenario_b_eq_with_selection_fires() {
    let mut r1 = rule(1, &[("=", 10, Some(5))]);
    r1.severity = Severity::Error;
    r1.message = "Unstructured source needs review".to_string();
    let engine = engine(vec![r1]);
    engine.source().select(USER, SALESFORCE, 10, 5);

    let hits = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].rule_id, 1);
    assert_eq!(hits[0].name, "R1");
    assert_eq!(hits[0].severity, Severity::Error);
    assert_eq!(hits[0].message, "Unstructured source needs review");
}

#[tokio::test]
async fn scenario_c_and_with_not_eq_fires() {
    let engine = engine(vec![rule(2, &[("=", 10, Some(5)), ("!=", 20, Some(7))])]);
    engine.source().select(USER, SALESFORCE, 10, 5);
    engine.source().select(USER, SALESFORCE, 20, 9);

    let hits = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert_eq!(hit_ids(&hits), vec![2]);
}

#[tokio::test]
async fn scenario_d_scoped_rule_skipped_for_other_source() {
    let mut r3 = rule(3, &[]);
    r3.data_source_filter = Some(SALESFORCE.to_string());
    let engine = engine(vec![r3]);

    assert!(engine.evaluate(USER, WORKDAY).await.unwrap().is_empty());
    assert_eq!(hit_ids(&engine.evaluate(USER, SALESFORCE).await.unwrap()), vec![3]);
}

#[tokio::test]
async fn scenario_e_inactive_rule_never_fires() {
    let mut r4 = rule(4, &[]);
    r4.is_active = false;
    let engine = engine(vec![r4]);
    assert!(engine.evaluate(USER, WORKDAY).await.unwrap().is_empty());
}

// ── Properties ──────────────────────────────────────────────

#[tokio::test]
async fn zero_condition_rules_fire_everywhere_in_scope() {
    let mut blank_scope = rule(5, &[]);
    blank_scope.data_source_filter = Some("  ".to_string());
    let engine = engine(vec![rule(6, &[]), blank_scope]);

    for source in [SALESFORCE, WORKDAY, "Anything"] {
        let hits = engine.evaluate("bob", source).await.unwrap();
        assert_eq!(hits.len(), 2, "source {}", source);
    }
}

#[tokio::test]
async fn not_eq_matches_absent_and_different_only() {
    let engine = engine(vec![rule(7, &[("<>", 20, Some(7))])]);

    assert_eq!(hit_ids(&engine.evaluate(USER, SALESFORCE).await.unwrap()), vec![7]);

    engine.source().select(USER, SALESFORCE, 20, 8);
    assert_eq!(hit_ids(&engine.evaluate(USER, SALESFORCE).await.unwrap()), vec![7]);

    engine.source().select(USER, SALESFORCE, 20, 7);
    assert!(engine.evaluate(USER, SALESFORCE).await.unwrap().is_empty());
}

#[tokio::test]
async fn null_checks_partition_every_state() {
    let engine = engine(vec![
        rule(8, &[("IS NULL", 10, None)]),
        rule(9, &[("is not null", 10, None)]),
    ]);

    let before = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert_eq!(hit_ids(&before), vec![8]);

    engine.source().select(USER, SALESFORCE, 10, 1);
    let after = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert_eq!(hit_ids(&after), vec![9]);
}

#[tokio::test]
async fn repeated_evaluation_is_stable() {
    let engine = engine(vec![
        rule(1, &[("=", 10, Some(5))]),
        rule(2, &[("IS NULL", 20, None)]),
        rule(3, &[]),
    ]);
    engine.source().select(USER, SALESFORCE, 10, 5);

    let first = engine.evaluate(USER, SALESFORCE).await.unwrap();
    for _ in 0..5 {
        assert_eq!(engine.evaluate(USER, SALESFORCE).await.unwrap(), first);
    }
    assert_eq!(hit_ids(&first), vec![3, 2, 1]);
}

#[tokio::test]
async fn hits_follow_store_order() {
    let mut older = rule(10, &[]);
    older.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let engine = engine(vec![older, rule(11, &[]), rule(12, &[])]);

    let hits = engine.evaluate(USER, SALESFORCE).await.unwrap();
    assert_eq!(hit_ids(&hits), vec![12, 11, 10]);
}

#[tokio::test]
async fn selections_do_not_leak_between_sources() {
    let engine = engine(vec![rule(1, &[("=", 10, Some(5))])]);
    engine.source().select(USER, WORKDAY, 10, 5);

    assert!(engine.evaluate(USER, SALESFORCE).await.unwrap().is_empty());
    assert_eq!(hit_ids(&engine.evaluate(USER, WORKDAY).await.unwrap()), vec![1]);
}

#[tokio::test]
async fn inputs_are_trimmed() {
    let engine = engine(vec![rule(1, &[("=", 10, Some(5))])]);
    engine.source().select(USER, SALESFORCE, 10, 5);

    let hits = engine.evaluate("  alice ", " Salesforce API ").await.unwrap();
    assert_eq!(hit_ids(&hits), vec![1]);
}

// ── Failures ────────────────────────────────────────────────

#[tokio::test]
async fn blank_inputs_are_rejected() {
    let engine = engine(vec![rule(1, &[])]);

    let err = engine.evaluate("  ", SALESFORCE).await.unwrap_err();
    assert!(matches!(err, EvaluationError::InvalidInput(_)));

    let err = engine.evaluate(USER, "").await.unwrap_err();
    assert!(matches!(err, EvaluationError::InvalidInput(_)));
}

#[tokio::test]
async fn unavailable_store_yields_no_partial_results() {
    let engine = engine(vec![rule(1, &[])]);
    engine.source().set_offline(true);

    let err = engine.evaluate(USER, SALESFORCE).await.unwrap_err();
    assert!(matches!(err, EvaluationError::StoreUnavailable(_)));

    engine.source().set_offline(false);
    assert_eq!(engine.evaluate(USER, SALESFORCE).await.unwrap().len(), 1);
}
