use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::purchase::{self, Column, Entity};
use crate::purchase_status;
use crate::store::BizStore;

/// 订单数据行（来自 purchases 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub purchased_at: DateTime<Utc>,
}

/// 单月营收聚合结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthAggregate {
    pub revenue: f64,
    pub purchase_count: u64,
}

#[derive(FromQueryResult)]
struct SumCount {
    total: Option<f64>,
    cnt: i64,
}

fn to_row(m: purchase::Model) -> PurchaseRow {
    PurchaseRow {
        id: m.id,
        amount: m.amount,
        currency: m.currency,
        status: m.status,
        purchased_at: m.purchased_at.with_timezone(&Utc),
    }
}

impl BizStore {
    pub async fn insert_purchase(&self, row: &PurchaseRow) -> Result<PurchaseRow> {
        let now = Utc::now().fixed_offset();
        let am = purchase::ActiveModel {
            id: Set(row.id.clone()),
            amount: Set(row.amount),
            currency: Set(row.currency.clone()),
            status: Set(row.status.clone()),
            purchased_at: Set(row.purchased_at.fixed_offset()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// 已完成订单的营收总和；`since` 为 None 时统计全量。
    pub async fn sum_completed_revenue(&self, since: Option<DateTime<Utc>>) -> Result<f64> {
        let mut q = Entity::find()
            .select_only()
            .column_as(Column::Amount.sum(), "total")
            .column_as(Column::Id.count(), "cnt")
            .filter(Column::Status.eq(purchase_status::COMPLETED));
        if let Some(since) = since {
            q = q.filter(Column::PurchasedAt.gte(since.fixed_offset()));
        }
        let agg = q.into_model::<SumCount>().one(self.db()).await?;
        Ok(agg.and_then(|a| a.total).unwrap_or(0.0))
    }

    /// 全量已完成订单数（AOV 的分母）。
    pub async fn count_completed_purchases(&self) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Status.eq(purchase_status::COMPLETED))
            .count(self.db())
            .await?)
    }

    /// 窗口内已完成订单数（漏斗转化率的分子）。
    pub async fn count_completed_purchases_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Status.eq(purchase_status::COMPLETED))
            .filter(Column::PurchasedAt.gte(from.fixed_offset()))
            .filter(Column::PurchasedAt.lt(to.fixed_offset()))
            .count(self.db())
            .await?)
    }

    /// `[from, to)` 月度窗口内已完成订单的营收与订单数。
    pub async fn month_revenue(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<MonthAggregate> {
        let agg = Entity::find()
            .select_only()
            .column_as(Column::Amount.sum(), "total")
            .column_as(Column::Id.count(), "cnt")
            .filter(Column::Status.eq(purchase_status::COMPLETED))
            .filter(Column::PurchasedAt.gte(from.fixed_offset()))
            .filter(Column::PurchasedAt.lt(to.fixed_offset()))
            .into_model::<SumCount>()
            .one(self.db())
            .await?;
        Ok(match agg {
            Some(a) => MonthAggregate {
                revenue: a.total.unwrap_or(0.0),
                purchase_count: a.cnt as u64,
            },
            None => MonthAggregate {
                revenue: 0.0,
                purchase_count: 0,
            },
        })
    }

    /// 退款总额与笔数。
    pub async fn refund_totals(&self) -> Result<(f64, u64)> {
        let agg = Entity::find()
            .select_only()
            .column_as(Column::Amount.sum(), "total")
            .column_as(Column::Id.count(), "cnt")
            .filter(Column::Status.eq(purchase_status::REFUNDED))
            .into_model::<SumCount>()
            .one(self.db())
            .await?;
        Ok(match agg {
            Some(a) => (a.total.unwrap_or(0.0), a.cnt as u64),
            None => (0.0, 0),
        })
    }
}
