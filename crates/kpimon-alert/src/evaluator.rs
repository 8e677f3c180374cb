use kpimon_common::types::{Condition, MetricKind, MetricSnapshot};
use kpimon_storage::AlertRuleRow;

/// Outcome of evaluating one rule against a snapshot.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metric: MetricKind,
    pub condition: Condition,
    pub value: f64,
    pub message: String,
}

/// Pure condition check.
///
/// `ChangePercent` compares the current value's absolute magnitude to the
/// threshold; it does not diff against a prior period (no baseline period
/// is defined for these rules).
pub fn evaluate_condition(condition: Condition, value: f64, threshold: f64) -> bool {
    match condition {
        Condition::Below => value < threshold,
        Condition::Above => value > threshold,
        Condition::ChangePercent => value.abs() > threshold,
    }
}

/// Renders the human-readable alert message.
///
/// Percentage metrics carry a `%` suffix on both threshold and value;
/// `daily_sessions` stays unitless.
pub fn render_message(
    name: &str,
    metric: MetricKind,
    condition: Condition,
    threshold: f64,
    value: f64,
) -> String {
    let unit = if metric.is_percentage() { "%" } else { "" };
    format!(
        "{name}: {} {} {threshold}{unit} (current value: {value}{unit})",
        metric.label(),
        condition.label(),
    )
}

/// Evaluates one rule against the snapshot.
///
/// A rule whose stored metric or condition string no longer parses is
/// skipped (returns `None` with a warning) — one stale row must not take
/// down the whole check run.
pub fn evaluate_rule(rule: &AlertRuleRow, snapshot: &MetricSnapshot) -> Option<Evaluation> {
    let metric: MetricKind = match rule.metric.parse() {
        Ok(m) => m,
        Err(_) => {
            tracing::warn!(
                rule_id = %rule.id,
                metric = %rule.metric,
                "Rule references an unknown metric, skipping"
            );
            return None;
        }
    };
    let condition: Condition = match rule.condition.parse() {
        Ok(c) => c,
        Err(_) => {
            tracing::warn!(
                rule_id = %rule.id,
                condition = %rule.condition,
                "Rule references an unknown condition, skipping"
            );
            return None;
        }
    };

    let value = snapshot.value(metric);
    if !evaluate_condition(condition, value, rule.threshold) {
        return None;
    }

    Some(Evaluation {
        metric,
        condition,
        value,
        message: render_message(&rule.name, metric, condition, rule.threshold, value),
    })
}
