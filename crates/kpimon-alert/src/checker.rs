use chrono::{DateTime, Duration, Utc};
use kpimon_common::types::{MetricSnapshot, TriggeredAlert};
use kpimon_storage::{AlertRuleRow, BizStore};
use std::sync::Arc;

use crate::error::Result;
use crate::evaluator::evaluate_rule;

/// Runs one alert check: every enabled rule is evaluated against the given
/// snapshot, and every trigger is recorded (history row + rule counters)
/// in a single transaction per rule.
pub struct AlertChecker {
    store: Arc<BizStore>,
}

impl AlertChecker {
    pub fn new(store: Arc<BizStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, snapshot: &MetricSnapshot) -> Result<Vec<TriggeredAlert>> {
        self.run_at(snapshot, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        snapshot: &MetricSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Vec<TriggeredAlert>> {
        let rules = self.store.list_enabled_alert_rules().await?;
        let mut triggered = Vec::new();

        for rule in rules {
            if in_cooldown(&rule, now) {
                tracing::debug!(
                    rule_id = %rule.id,
                    cooldown_secs = rule.cooldown_secs,
                    "Alert suppressed (cooldown period)"
                );
                continue;
            }

            let Some(eval) = evaluate_rule(&rule, snapshot) else {
                continue;
            };

            self.store
                .record_trigger(&rule.id, eval.value, rule.threshold, &eval.message, now)
                .await?;

            tracing::info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                metric = %eval.metric,
                value = eval.value,
                threshold = rule.threshold,
                "Alert triggered"
            );

            triggered.push(TriggeredAlert {
                rule_id: rule.id,
                rule_name: rule.name,
                metric: eval.metric,
                value: eval.value,
                threshold: rule.threshold,
                message: eval.message,
                triggered_at: now,
            });
        }

        Ok(triggered)
    }
}

/// A rule with a positive cooldown that fired inside the window is not
/// re-evaluated. At the default `cooldown_secs = 0` every evaluation may
/// trigger.
fn in_cooldown(rule: &AlertRuleRow, now: DateTime<Utc>) -> bool {
    rule.cooldown_secs > 0
        && rule
            .last_triggered_at
            .is_some_and(|last| now - last < Duration::seconds(rule.cooldown_secs))
}
