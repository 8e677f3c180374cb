use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::funnel_session::{self, Column, Entity};
use crate::store::BizStore;

/// 漏斗会话数据行（来自 funnel_sessions 表）
///
/// `created_at` 即注册时间，`updated_at` 即最后活跃时间。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub email: String,
    pub completed: bool,
    pub exit_step: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: funnel_session::Model) -> SessionRow {
    SessionRow {
        id: m.id,
        email: m.email,
        completed: m.completed,
        exit_step: m.exit_step,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl BizStore {
    pub async fn insert_session(&self, row: &SessionRow) -> Result<SessionRow> {
        let am = funnel_session::ActiveModel {
            id: Set(row.id.clone()),
            email: Set(row.email.clone()),
            completed: Set(row.completed),
            exit_step: Set(row.exit_step),
            created_at: Set(row.created_at.fixed_offset()),
            updated_at: Set(row.updated_at.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// 全量会话，按注册时间升序（留存分析的输入）。
    pub async fn list_sessions_by_signup(&self) -> Result<Vec<SessionRow>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    /// 窗口内完成的会话数（completed 且最后活跃时间落在窗口内）。
    pub async fn count_completed_sessions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Completed.eq(true))
            .filter(Column::UpdatedAt.gte(from.fixed_offset()))
            .filter(Column::UpdatedAt.lt(to.fixed_offset()))
            .count(self.db())
            .await?)
    }

    /// 全量去重用户数（按 email）。
    pub async fn count_distinct_users(&self) -> Result<u64> {
        let emails: Vec<String> = Entity::find()
            .select_only()
            .column(Column::Email)
            .distinct()
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(emails.len() as u64)
    }

    /// 自 `cutoff` 起有过活跃（updated_at）的去重用户数。
    pub async fn count_active_users_since(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let emails: Vec<String> = Entity::find()
            .select_only()
            .column(Column::Email)
            .distinct()
            .filter(Column::UpdatedAt.gte(cutoff.fixed_offset()))
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(emails.len() as u64)
    }
}
