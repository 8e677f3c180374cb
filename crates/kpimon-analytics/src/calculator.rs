use chrono::{DateTime, Duration, Utc};
use kpimon_common::types::FunnelCounts;
use kpimon_storage::BizStore;

use crate::error::{AnalyticsError, Result};

/// Gathers the raw funnel counts for a trailing window ending at `now`.
///
/// The three counts come from three independent range queries; read skew
/// between them is tolerated (each metric is an approximation already).
/// The window is half-open: `[now - days, now)` plus the current instant.
pub async fn funnel_counts(
    store: &BizStore,
    days: u32,
    now: DateTime<Utc>,
) -> Result<FunnelCounts> {
    let from = now - Duration::days(days as i64);
    let to = now + Duration::seconds(1);

    let total_sessions = store
        .count_distinct_sessions_between(from, to)
        .await
        .map_err(AnalyticsError::upstream("funnel_sessions"))?;

    let completed_sessions = store
        .count_completed_sessions_between(from, to)
        .await
        .map_err(AnalyticsError::upstream("funnel_completions"))?;

    let total_orders = store
        .count_completed_purchases_between(from, to)
        .await
        .map_err(AnalyticsError::upstream("funnel_orders"))?;

    Ok(FunnelCounts {
        total_sessions,
        completed_sessions,
        total_orders,
    })
}
