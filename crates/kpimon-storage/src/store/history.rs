use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::alert_history::{self, Column, Entity};
use crate::entities::alert_rule;
use crate::store::BizStore;

/// 告警历史数据行（来自 alert_history 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryRow {
    pub id: String,
    pub rule_id: String,
    pub metric_value: f64,
    pub threshold_value: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub is_read: bool,
}

/// 未读通知（历史行关联规则名称与指标，供展示）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadNotification {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub metric: String,
    pub metric_value: f64,
    pub threshold_value: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

pub(crate) fn to_history_row(m: alert_history::Model) -> AlertHistoryRow {
    AlertHistoryRow {
        id: m.id,
        rule_id: m.rule_id,
        metric_value: m.metric_value,
        threshold_value: m.threshold_value,
        message: m.message,
        triggered_at: m.triggered_at.with_timezone(&Utc),
        is_read: m.is_read,
    }
}

impl BizStore {
    /// 未读通知，按触发时间倒序，关联规则名称与指标。
    ///
    /// 规则在历史行写入后被删除时，该行仍会返回（规则字段以占位符填充）。
    pub async fn list_unread_notifications(&self, limit: usize) -> Result<Vec<UnreadNotification>> {
        let rows = Entity::find()
            .filter(Column::IsRead.eq(false))
            .order_by(Column::TriggeredAt, Order::Desc)
            .limit(limit as u64)
            .all(self.db())
            .await?;

        let rule_ids: Vec<String> = rows.iter().map(|r| r.rule_id.clone()).collect();
        let rules: HashMap<String, alert_rule::Model> = alert_rule::Entity::find()
            .filter(alert_rule::Column::Id.is_in(rule_ids))
            .all(self.db())
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(rows
            .into_iter()
            .map(|h| {
                let (rule_name, metric) = match rules.get(&h.rule_id) {
                    Some(r) => (r.name.clone(), r.metric.clone()),
                    None => ("(deleted rule)".to_string(), String::new()),
                };
                UnreadNotification {
                    id: h.id,
                    rule_id: h.rule_id,
                    rule_name,
                    metric,
                    metric_value: h.metric_value,
                    threshold_value: h.threshold_value,
                    message: h.message,
                    triggered_at: h.triggered_at.with_timezone(&Utc),
                }
            })
            .collect())
    }

    pub async fn count_unread_notifications(&self) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::IsRead.eq(false))
            .count(self.db())
            .await?)
    }

    /// 全局批量已读。幂等：第二次调用影响 0 行。
    pub async fn mark_all_notifications_read(&self) -> Result<u64> {
        let res = Entity::update_many()
            .col_expr(Column::IsRead, Expr::value(true))
            .filter(Column::IsRead.eq(false))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }

    /// 某条规则的历史行数（测试与诊断用）。
    pub async fn count_history_for_rule(&self, rule_id: &str) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::RuleId.eq(rule_id))
            .count(self.db())
            .await?)
    }
}
