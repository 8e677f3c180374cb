use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use kpimon_storage::BizStore;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// How many trailing calendar months the revenue trend covers.
const TREND_MONTHS: i32 = 12;

/// 单月营收趋势点
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonthRevenue {
    /// 月份（%Y-%m）
    pub month: String,
    /// 该月已完成订单营收
    pub revenue: f64,
    /// 该月已完成订单数
    pub purchase_count: u64,
}

/// 退款汇总
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RefundSummary {
    /// 退款总额
    pub total: f64,
    /// 退款笔数
    pub count: u64,
}

/// 营收报表
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RevenueReport {
    /// 全量已完成订单营收
    pub total_revenue: f64,
    /// 查询窗口内营收
    pub period_revenue: f64,
    /// 近 30 天营收（MRR 近似值，与查询窗口无关）
    pub mrr: f64,
    /// 平均订单价值
    pub aov: f64,
    /// 近 12 个自然月营收趋势（从旧到新）
    pub trend: Vec<MonthRevenue>,
    /// 退款汇总
    pub refunds: RefundSummary,
}

/// Rounds a money figure to cents for presentation.
fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn shift_month(year: i32, month0: i32, delta: i32) -> (i32, u32) {
    let total = year * 12 + month0 + delta;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first day of month is a valid UTC timestamp")
}

/// `[start, end)` windows for the trailing `TREND_MONTHS` calendar months,
/// oldest first, each labelled `%Y-%m`.
pub(crate) fn trend_windows(now: DateTime<Utc>) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
    let year = now.year();
    let month0 = now.month() as i32 - 1;

    (0..TREND_MONTHS)
        .map(|i| {
            let back = TREND_MONTHS - 1 - i;
            let (sy, sm) = shift_month(year, month0, -back);
            let (ey, em) = shift_month(year, month0, -back + 1);
            let start = month_start(sy, sm);
            let end = month_start(ey, em);
            (format!("{sy:04}-{sm:02}"), start, end)
        })
        .collect()
}

/// Builds the full revenue report for a trailing window of `days`.
///
/// The 12 month sub-queries are independent range scans; they are issued
/// through a bounded fan-out (`concurrency` in flight at once) rather than
/// serially, and the results come back oldest-to-newest.
pub async fn revenue_report(
    store: &BizStore,
    days: u32,
    concurrency: usize,
    now: DateTime<Utc>,
) -> Result<RevenueReport> {
    let total_revenue = store
        .sum_completed_revenue(None)
        .await
        .map_err(AnalyticsError::upstream("total_revenue"))?;

    let period_revenue = store
        .sum_completed_revenue(Some(now - Duration::days(days as i64)))
        .await
        .map_err(AnalyticsError::upstream("period_revenue"))?;

    // Trailing 30 days, independent of the requested window
    let mrr = store
        .sum_completed_revenue(Some(now - Duration::days(30)))
        .await
        .map_err(AnalyticsError::upstream("mrr"))?;

    let completed_count = store
        .count_completed_purchases()
        .await
        .map_err(AnalyticsError::upstream("aov"))?;
    let aov = if completed_count == 0 {
        0.0
    } else {
        total_revenue / completed_count as f64
    };

    let trend: Vec<MonthRevenue> = stream::iter(trend_windows(now).into_iter().map(
        |(month, from, to)| async move {
            let agg = store
                .month_revenue(from, to)
                .await
                .map_err(AnalyticsError::upstream("revenue_trend"))?;
            Ok::<_, AnalyticsError>(MonthRevenue {
                month,
                revenue: round_cents(agg.revenue),
                purchase_count: agg.purchase_count,
            })
        },
    ))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    let (refund_total, refund_count) = store
        .refund_totals()
        .await
        .map_err(AnalyticsError::upstream("refunds"))?;

    Ok(RevenueReport {
        total_revenue: round_cents(total_revenue),
        period_revenue: round_cents(period_revenue),
        mrr: round_cents(mrr),
        aov: round_cents(aov),
        trend,
        refunds: RefundSummary {
            total: round_cents(refund_total),
            count: refund_count,
        },
    })
}

/// Share of all-time users with no session activity in the trailing 30 days.
pub async fn churn_rate(store: &BizStore, now: DateTime<Utc>) -> Result<f64> {
    let unique_users = store
        .count_distinct_users()
        .await
        .map_err(AnalyticsError::upstream("churn_unique_users"))?;
    if unique_users == 0 {
        return Ok(0.0);
    }
    let active = store
        .count_active_users_since(now - Duration::days(30))
        .await
        .map_err(AnalyticsError::upstream("churn_active_users"))?;
    Ok((unique_users.saturating_sub(active)) as f64 / unique_users as f64 * 100.0)
}
