use chrono::Utc;
use kpimon_common::types::MetricSnapshot;
use kpimon_storage::BizStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::calculator::funnel_counts;
use crate::cohort::{retention_curves, CohortRow};
use crate::error::{AnalyticsError, Result};
use crate::revenue::{churn_rate, revenue_report, RevenueReport};

/// Tuning knobs for the analytics service.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsConfig {
    /// Trailing window (days) used when the caller does not pass one.
    pub default_window_days: u32,
    /// Overall deadline for one aggregate request.
    pub request_timeout_secs: u64,
    /// Max in-flight month sub-queries for the revenue trend.
    pub trend_concurrency: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_window_days: 7,
            request_timeout_secs: 30,
            trend_concurrency: 4,
        }
    }
}

/// 邮件营销汇总（占位：营销活动数据由外部系统生成）
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EmailSummary {
    /// 已发送营销活动数
    pub campaigns_sent: u64,
    /// 已送达邮件数
    pub emails_delivered: u64,
    /// 打开率（%）
    pub open_rate: f64,
}

/// 综合分析概览
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnalyticsOverview {
    /// 营收报表
    pub revenue: RevenueReport,
    /// 各注册月份队列的留存曲线
    pub retention: Vec<CohortRow>,
    /// 流失率（%）
    pub churn_rate: f64,
    /// 邮件营销汇总（占位）
    pub email: EmailSummary,
}

/// Store-backed analytics orchestrator.
///
/// Every request recomputes from the store: there is no metric cache and no
/// background refresh here. Each aggregate runs under one deadline; a blown
/// deadline or a failed sub-query fails the whole response rather than
/// substituting zeros.
pub struct AnalyticsService {
    store: Arc<BizStore>,
    config: AnalyticsConfig,
}

impl AnalyticsService {
    pub fn new(store: Arc<BizStore>, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn resolve_window(&self, days: Option<u32>) -> u32 {
        days.filter(|d| *d > 0)
            .unwrap_or(self.config.default_window_days)
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout_secs = self.config.request_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
            Ok(res) => res,
            Err(_) => Err(AnalyticsError::DeadlineExceeded { timeout_secs }),
        }
    }

    /// Full overview: revenue report, cohort retention, churn, and the
    /// email placeholder block.
    pub async fn overview(&self, days: Option<u32>) -> Result<AnalyticsOverview> {
        let days = self.resolve_window(days);
        self.with_deadline(self.overview_inner(days)).await
    }

    async fn overview_inner(&self, days: u32) -> Result<AnalyticsOverview> {
        let now = Utc::now();

        let revenue =
            revenue_report(&self.store, days, self.config.trend_concurrency, now).await?;

        let sessions = self
            .store
            .list_sessions_by_signup()
            .await
            .map_err(AnalyticsError::upstream("retention_sessions"))?;
        let retention = retention_curves(&sessions);

        let churn = churn_rate(&self.store, now).await?;

        tracing::debug!(
            days,
            cohorts = retention.len(),
            trend_months = revenue.trend.len(),
            "Computed analytics overview"
        );

        Ok(AnalyticsOverview {
            revenue,
            retention,
            churn_rate: churn,
            email: EmailSummary::default(),
        })
    }

    /// Funnel health snapshot for the alert checker.
    pub async fn funnel_snapshot(&self, days: Option<u32>) -> Result<MetricSnapshot> {
        let days = self.resolve_window(days);
        self.with_deadline(async {
            let counts = funnel_counts(&self.store, days, Utc::now()).await?;
            Ok(MetricSnapshot::from_counts(counts))
        })
        .await
    }
}
