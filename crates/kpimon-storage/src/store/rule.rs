use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::entities::alert_rule::{self, Column, Entity};
use crate::entities::alert_history;
use crate::store::history::{self, AlertHistoryRow};
use crate::store::BizStore;

/// 告警规则数据行（来自 alert_rules 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleRow {
    pub id: String,
    pub name: String,
    pub metric: String,
    pub condition: String,
    pub threshold: f64,
    pub category: Option<String>,
    pub enabled: bool,
    pub trigger_count: i64,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub cooldown_secs: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 告警规则更新请求（None 字段保持不变）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertRuleUpdate {
    pub name: Option<String>,
    pub metric: Option<String>,
    pub condition: Option<String>,
    pub threshold: Option<f64>,
    pub category: Option<String>,
    pub enabled: Option<bool>,
    pub cooldown_secs: Option<i64>,
}

fn to_row(m: alert_rule::Model) -> AlertRuleRow {
    AlertRuleRow {
        id: m.id,
        name: m.name,
        metric: m.metric,
        condition: m.condition,
        threshold: m.threshold,
        category: m.category,
        enabled: m.enabled,
        trigger_count: m.trigger_count,
        last_triggered_at: m.last_triggered_at.map(|t| t.with_timezone(&Utc)),
        cooldown_secs: m.cooldown_secs,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl BizStore {
    pub async fn insert_alert_rule(&self, row: &AlertRuleRow) -> Result<AlertRuleRow> {
        let now = Utc::now().fixed_offset();
        let am = alert_rule::ActiveModel {
            id: Set(row.id.clone()),
            name: Set(row.name.clone()),
            metric: Set(row.metric.clone()),
            condition: Set(row.condition.clone()),
            threshold: Set(row.threshold),
            category: Set(row.category.clone()),
            enabled: Set(row.enabled),
            trigger_count: Set(row.trigger_count),
            last_triggered_at: Set(row.last_triggered_at.map(|t| t.fixed_offset())),
            cooldown_secs: Set(row.cooldown_secs),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_alert_rule_by_id(&self, id: &str) -> Result<Option<AlertRuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_alert_rules(&self, limit: usize, offset: usize) -> Result<Vec<AlertRuleRow>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_alert_rules(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }

    pub async fn list_enabled_alert_rules(&self) -> Result<Vec<AlertRuleRow>> {
        let rows = Entity::find()
            .filter(Column::Enabled.eq(true))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn update_alert_rule(
        &self,
        id: &str,
        upd: &AlertRuleUpdate,
    ) -> Result<Option<AlertRuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: alert_rule::ActiveModel = m.into();
            if let Some(ref name) = upd.name {
                am.name = Set(name.clone());
            }
            if let Some(ref metric) = upd.metric {
                am.metric = Set(metric.clone());
            }
            if let Some(ref condition) = upd.condition {
                am.condition = Set(condition.clone());
            }
            if let Some(threshold) = upd.threshold {
                am.threshold = Set(threshold);
            }
            if let Some(ref category) = upd.category {
                am.category = Set(Some(category.clone()));
            }
            if let Some(enabled) = upd.enabled {
                am.enabled = Set(enabled);
            }
            if let Some(cooldown) = upd.cooldown_secs {
                am.cooldown_secs = Set(cooldown);
            }
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_alert_rule(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// 记录一次触发：插入历史行并更新规则计数，两个写入在同一事务内。
    ///
    /// 返回插入的历史行；规则不存在时返回错误（历史行必须引用现存规则）。
    pub async fn record_trigger(
        &self,
        rule_id: &str,
        metric_value: f64,
        threshold_value: f64,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<AlertHistoryRow> {
        let txn = self.db().begin().await?;

        let rule = alert_rule::Entity::find_by_id(rule_id)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("alert rule '{rule_id}' not found"))?;
        let trigger_count = rule.trigger_count;

        let hist = alert_history::ActiveModel {
            id: Set(kpimon_common::id::next_id()),
            rule_id: Set(rule_id.to_owned()),
            metric_value: Set(metric_value),
            threshold_value: Set(threshold_value),
            message: Set(message.to_owned()),
            triggered_at: Set(now.fixed_offset()),
            is_read: Set(false),
        };
        let inserted = hist.insert(&txn).await?;

        let mut am: alert_rule::ActiveModel = rule.into();
        am.trigger_count = Set(trigger_count + 1);
        am.last_triggered_at = Set(Some(now.fixed_offset()));
        am.updated_at = Set(now.fixed_offset());
        am.update(&txn).await?;

        txn.commit().await?;
        Ok(history::to_history_row(inserted))
    }
}
