use crate::checker::AlertChecker;
use crate::error::AlertError;
use crate::evaluator::{evaluate_condition, evaluate_rule, render_message};
use crate::rules;
use chrono::{Duration, Utc};
use kpimon_common::types::{
    Condition, CreateAlertRuleRequest, FunnelCounts, MetricKind, MetricSnapshot,
    UpdateAlertRuleRequest,
};
use kpimon_storage::{AlertRuleRow, BizStore};
use std::sync::Arc;
use tempfile::TempDir;

fn make_rule(metric: &str, condition: &str, threshold: f64) -> AlertRuleRow {
    let now = Utc::now();
    AlertRuleRow {
        id: kpimon_common::id::next_id(),
        name: "Checkout health".to_string(),
        metric: metric.to_string(),
        condition: condition.to_string(),
        threshold,
        category: Some("checkout".to_string()),
        enabled: true,
        trigger_count: 0,
        last_triggered_at: None,
        cooldown_secs: 0,
        created_at: now,
        updated_at: now,
    }
}

fn snapshot(completion: f64, daily: f64, conversion: f64, abandoned: f64) -> MetricSnapshot {
    MetricSnapshot {
        completion_rate: completion,
        daily_sessions: daily,
        conversion_rate: conversion,
        abandoned_rate: abandoned,
    }
}

async fn setup_store() -> (TempDir, Arc<BizStore>) {
    kpimon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("kpimon.db").display());
    let store = BizStore::new(&url).await.unwrap();
    (dir, Arc::new(store))
}

// ---- condition semantics ----

#[test]
fn below_and_above_are_strict_comparisons() {
    for value in [-5.0, 0.0, 39.9, 40.0, 40.1, 100.0] {
        assert_eq!(
            evaluate_condition(Condition::Below, value, 40.0),
            value < 40.0
        );
        assert_eq!(
            evaluate_condition(Condition::Above, value, 40.0),
            value > 40.0
        );
    }
}

#[test]
fn change_percent_compares_magnitude() {
    assert!(evaluate_condition(Condition::ChangePercent, 25.0, 20.0));
    assert!(evaluate_condition(Condition::ChangePercent, -25.0, 20.0));
    assert!(!evaluate_condition(Condition::ChangePercent, 15.0, 20.0));
    assert!(!evaluate_condition(Condition::ChangePercent, 20.0, 20.0));
}

// ---- message rendering ----

#[test]
fn message_carries_percent_suffix_for_rate_metrics() {
    let msg = render_message(
        "Low completion",
        MetricKind::CompletionRate,
        Condition::Below,
        50.0,
        40.0,
    );
    assert_eq!(
        msg,
        "Low completion: Completion Rate below 50% (current value: 40%)"
    );
}

#[test]
fn message_is_unitless_for_daily_sessions() {
    let msg = render_message(
        "Traffic spike",
        MetricKind::DailySessions,
        Condition::Above,
        100.0,
        150.0,
    );
    assert_eq!(
        msg,
        "Traffic spike: Daily Sessions above 100 (current value: 150)"
    );
}

// ---- rule evaluation ----

#[test]
fn rule_fires_when_condition_holds() {
    let rule = make_rule("completion_rate", "below", 50.0);
    let snap = snapshot(40.0, 10.0, 50.0, 60.0);

    let eval = evaluate_rule(&rule, &snap).expect("rule should trigger");
    assert_eq!(eval.metric, MetricKind::CompletionRate);
    assert_eq!(eval.value, 40.0);
}

#[test]
fn rule_does_not_fire_when_condition_fails() {
    let rule = make_rule("completion_rate", "below", 50.0);
    let snap = snapshot(75.0, 10.0, 50.0, 25.0);
    assert!(evaluate_rule(&rule, &snap).is_none());
}

#[test]
fn rule_with_unknown_metric_is_inert() {
    let rule = make_rule("bounce_rate", "below", 50.0);
    let snap = snapshot(0.0, 0.0, 0.0, 0.0);
    assert!(evaluate_rule(&rule, &snap).is_none());
}

#[test]
fn rule_with_unknown_condition_is_inert() {
    let rule = make_rule("completion_rate", "equals", 50.0);
    let snap = snapshot(50.0, 0.0, 0.0, 50.0);
    assert!(evaluate_rule(&rule, &snap).is_none());
}

// ---- check run bookkeeping ----

#[tokio::test]
async fn check_run_records_trigger_once() {
    let (_dir, store) = setup_store().await;
    let rule = store
        .insert_alert_rule(&make_rule("completion_rate", "below", 50.0))
        .await
        .unwrap();

    let checker = AlertChecker::new(store.clone());
    let snap = MetricSnapshot::from_counts(FunnelCounts {
        total_sessions: 10,
        completed_sessions: 4,
        total_orders: 2,
    });

    let triggered = checker.run(&snap).await.unwrap();
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].value, 40.0);
    assert_eq!(triggered[0].threshold, 50.0);

    let stored = store.get_alert_rule_by_id(&rule.id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 1);
    assert_eq!(store.count_history_for_rule(&rule.id).await.unwrap(), 1);

    let unread = store.list_unread_notifications(20).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].metric_value, 40.0);
    assert_eq!(unread[0].threshold_value, 50.0);
}

#[tokio::test]
async fn disabled_rules_are_never_evaluated() {
    let (_dir, store) = setup_store().await;
    let mut rule = make_rule("completion_rate", "below", 50.0);
    rule.enabled = false;
    let rule = store.insert_alert_rule(&rule).await.unwrap();

    let checker = AlertChecker::new(store.clone());
    let snap = snapshot(0.0, 0.0, 0.0, 0.0);
    let triggered = checker.run(&snap).await.unwrap();

    assert!(triggered.is_empty());
    assert_eq!(store.count_history_for_rule(&rule.id).await.unwrap(), 0);
}

#[tokio::test]
async fn cooldown_suppresses_repeat_triggers() {
    let (_dir, store) = setup_store().await;
    let mut rule = make_rule("completion_rate", "below", 50.0);
    rule.cooldown_secs = 600;
    let rule = store.insert_alert_rule(&rule).await.unwrap();

    let checker = AlertChecker::new(store.clone());
    let snap = snapshot(40.0, 10.0, 50.0, 60.0);
    let now = Utc::now();

    let first = checker.run_at(&snap, now).await.unwrap();
    assert_eq!(first.len(), 1);

    // Within the cooldown window: suppressed
    let second = checker
        .run_at(&snap, now + Duration::seconds(60))
        .await
        .unwrap();
    assert!(second.is_empty());

    // After the window: fires again
    let third = checker
        .run_at(&snap, now + Duration::seconds(601))
        .await
        .unwrap();
    assert_eq!(third.len(), 1);

    let stored = store.get_alert_rule_by_id(&rule.id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 2);
}

#[tokio::test]
async fn zero_cooldown_triggers_on_every_run() {
    let (_dir, store) = setup_store().await;
    let rule = store
        .insert_alert_rule(&make_rule("abandoned_rate", "above", 50.0))
        .await
        .unwrap();

    let checker = AlertChecker::new(store.clone());
    let snap = snapshot(40.0, 10.0, 50.0, 60.0);

    checker.run(&snap).await.unwrap();
    checker.run(&snap).await.unwrap();

    let stored = store.get_alert_rule_by_id(&rule.id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 2);
}

// ---- rule admin validation ----

#[tokio::test]
async fn create_rule_without_threshold_is_rejected_before_write() {
    let (_dir, store) = setup_store().await;
    let req = CreateAlertRuleRequest {
        name: Some("No threshold".to_string()),
        metric_type: Some("completion_rate".to_string()),
        condition: Some("below".to_string()),
        threshold: None,
        category: None,
        cooldown_secs: None,
    };

    let err = rules::create_rule(&store, &req).await.unwrap_err();
    assert!(matches!(err, AlertError::Validation(_)));
    assert_eq!(store.count_alert_rules().await.unwrap(), 0);
}

#[tokio::test]
async fn create_rule_rejects_unknown_metric_and_nonfinite_threshold() {
    let (_dir, store) = setup_store().await;

    let bad_metric = CreateAlertRuleRequest {
        name: Some("Bad metric".to_string()),
        metric_type: Some("bounce_rate".to_string()),
        condition: Some("below".to_string()),
        threshold: Some(10.0),
        category: None,
        cooldown_secs: None,
    };
    assert!(matches!(
        rules::create_rule(&store, &bad_metric).await.unwrap_err(),
        AlertError::Validation(_)
    ));

    let bad_threshold = CreateAlertRuleRequest {
        name: Some("Bad threshold".to_string()),
        metric_type: Some("completion_rate".to_string()),
        condition: Some("below".to_string()),
        threshold: Some(f64::NAN),
        category: None,
        cooldown_secs: None,
    };
    assert!(matches!(
        rules::create_rule(&store, &bad_threshold).await.unwrap_err(),
        AlertError::Validation(_)
    ));

    assert_eq!(store.count_alert_rules().await.unwrap(), 0);
}

#[tokio::test]
async fn create_then_update_and_delete_rule() {
    let (_dir, store) = setup_store().await;
    let created = rules::create_rule(
        &store,
        &CreateAlertRuleRequest {
            name: Some("Low conversion".to_string()),
            metric_type: Some("conversion_rate".to_string()),
            condition: Some("below".to_string()),
            threshold: Some(20.0),
            category: Some("checkout".to_string()),
            cooldown_secs: Some(300),
        },
    )
    .await
    .unwrap();
    assert!(created.enabled);
    assert_eq!(created.cooldown_secs, 300);

    let updated = rules::update_rule(
        &store,
        &created.id,
        &UpdateAlertRuleRequest {
            name: None,
            metric_type: None,
            condition: Some("above".to_string()),
            threshold: Some(35.0),
            category: None,
            enabled: Some(false),
            cooldown_secs: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.condition, "above");
    assert_eq!(updated.threshold, 35.0);
    assert!(!updated.enabled);

    rules::delete_rule(&store, &created.id).await.unwrap();
    let err = rules::delete_rule(&store, &created.id).await.unwrap_err();
    assert!(matches!(err, AlertError::NotFound(_)));
}

#[tokio::test]
async fn update_missing_rule_is_not_found() {
    let (_dir, store) = setup_store().await;
    let err = rules::update_rule(
        &store,
        "no-such-id",
        &UpdateAlertRuleRequest {
            name: None,
            metric_type: None,
            condition: None,
            threshold: Some(1.0),
            category: None,
            enabled: None,
            cooldown_secs: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AlertError::NotFound(_)));
}
