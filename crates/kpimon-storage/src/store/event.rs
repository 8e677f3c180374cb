use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::funnel_event::{self, Column, Entity};
use crate::store::BizStore;

/// 漏斗事件数据行（来自 funnel_events 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub session_id: String,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
}

fn to_row(m: funnel_event::Model) -> EventRow {
    EventRow {
        id: m.id,
        session_id: m.session_id,
        category: m.category,
        occurred_at: m.occurred_at.with_timezone(&Utc),
    }
}

impl BizStore {
    pub async fn insert_event(&self, row: &EventRow) -> Result<EventRow> {
        let now = Utc::now().fixed_offset();
        let am = funnel_event::ActiveModel {
            id: Set(row.id.clone()),
            session_id: Set(row.session_id.clone()),
            category: Set(row.category.clone()),
            occurred_at: Set(row.occurred_at.fixed_offset()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// 窗口内被事件触达的去重会话数。
    pub async fn count_distinct_sessions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let ids: Vec<String> = Entity::find()
            .select_only()
            .column(Column::SessionId)
            .distinct()
            .filter(Column::OccurredAt.gte(from.fixed_offset()))
            .filter(Column::OccurredAt.lt(to.fixed_offset()))
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(ids.len() as u64)
    }
}
