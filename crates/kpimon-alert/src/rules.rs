use chrono::Utc;
use kpimon_common::types::{Condition, CreateAlertRuleRequest, MetricKind, UpdateAlertRuleRequest};
use kpimon_storage::{AlertRuleRow, AlertRuleUpdate, BizStore};

use crate::error::{AlertError, Result};

fn required_name(value: Option<&str>) -> Result<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AlertError::Validation("'name' is required".to_string()))
}

fn parse_metric(value: &str) -> Result<MetricKind> {
    value.parse().map_err(AlertError::Validation)
}

fn parse_condition(value: &str) -> Result<Condition> {
    value.parse().map_err(AlertError::Validation)
}

fn finite_threshold(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlertError::Validation(
            "'threshold' must be a finite number".to_string(),
        ))
    }
}

/// Creates a rule. All validation happens before any store access: a
/// rejected request never writes a row.
pub async fn create_rule(store: &BizStore, req: &CreateAlertRuleRequest) -> Result<AlertRuleRow> {
    let name = required_name(req.name.as_deref())?;
    let metric = parse_metric(
        req.metric_type
            .as_deref()
            .ok_or_else(|| AlertError::Validation("'metric_type' is required".to_string()))?,
    )?;
    let condition = parse_condition(
        req.condition
            .as_deref()
            .ok_or_else(|| AlertError::Validation("'condition' is required".to_string()))?,
    )?;
    let threshold = finite_threshold(
        req.threshold
            .ok_or_else(|| AlertError::Validation("'threshold' is required".to_string()))?,
    )?;

    let now = Utc::now();
    let row = AlertRuleRow {
        id: kpimon_common::id::next_id(),
        name,
        metric: metric.to_string(),
        condition: condition.to_string(),
        threshold,
        category: req.category.clone(),
        enabled: true,
        trigger_count: 0,
        last_triggered_at: None,
        cooldown_secs: req.cooldown_secs.unwrap_or(0) as i64,
        created_at: now,
        updated_at: now,
    };
    Ok(store.insert_alert_rule(&row).await?)
}

/// Applies a partial update. Present fields are validated with the same
/// rules as creation; absent fields stay unchanged.
pub async fn update_rule(
    store: &BizStore,
    id: &str,
    req: &UpdateAlertRuleRequest,
) -> Result<AlertRuleRow> {
    let mut upd = AlertRuleUpdate::default();
    if let Some(name) = req.name.as_deref() {
        upd.name = Some(required_name(Some(name))?);
    }
    if let Some(metric) = req.metric_type.as_deref() {
        upd.metric = Some(parse_metric(metric)?.to_string());
    }
    if let Some(condition) = req.condition.as_deref() {
        upd.condition = Some(parse_condition(condition)?.to_string());
    }
    if let Some(threshold) = req.threshold {
        upd.threshold = Some(finite_threshold(threshold)?);
    }
    if let Some(ref category) = req.category {
        upd.category = Some(category.clone());
    }
    upd.enabled = req.enabled;
    upd.cooldown_secs = req.cooldown_secs.map(|c| c as i64);

    store
        .update_alert_rule(id, &upd)
        .await?
        .ok_or_else(|| AlertError::NotFound(format!("alert rule '{id}' not found")))
}

pub async fn delete_rule(store: &BizStore, id: &str) -> Result<()> {
    if store.delete_alert_rule(id).await? {
        Ok(())
    } else {
        Err(AlertError::NotFound(format!("alert rule '{id}' not found")))
    }
}
