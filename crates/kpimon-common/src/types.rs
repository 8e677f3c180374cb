use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business health metric kind, computed per funnel window.
///
/// The set is closed: every dispatch site matches exhaustively, so adding
/// a kind forces every consumer to handle it.
///
/// # Examples
///
/// ```
/// use kpimon_common::types::MetricKind;
///
/// let kind: MetricKind = "completion_rate".parse().unwrap();
/// assert_eq!(kind, MetricKind::CompletionRate);
/// assert_eq!(kind.to_string(), "completion_rate");
/// assert!(kind.is_percentage());
/// assert!(!MetricKind::DailySessions.is_percentage());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CompletionRate,
    DailySessions,
    ConversionRate,
    AbandonedRate,
}

impl MetricKind {
    /// All kinds, in display order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::CompletionRate,
        MetricKind::DailySessions,
        MetricKind::ConversionRate,
        MetricKind::AbandonedRate,
    ];

    /// Whether values of this kind are percentages (rendered with a `%` suffix).
    /// `daily_sessions` is a plain count and stays unitless.
    pub fn is_percentage(&self) -> bool {
        !matches!(self, MetricKind::DailySessions)
    }

    /// Human-readable label used in alert messages and dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::CompletionRate => "Completion Rate",
            MetricKind::DailySessions => "Daily Sessions",
            MetricKind::ConversionRate => "Conversion Rate",
            MetricKind::AbandonedRate => "Abandonment Rate",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::CompletionRate => write!(f, "completion_rate"),
            MetricKind::DailySessions => write!(f, "daily_sessions"),
            MetricKind::ConversionRate => write!(f, "conversion_rate"),
            MetricKind::AbandonedRate => write!(f, "abandoned_rate"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completion_rate" => Ok(MetricKind::CompletionRate),
            "daily_sessions" => Ok(MetricKind::DailySessions),
            "conversion_rate" => Ok(MetricKind::ConversionRate),
            "abandoned_rate" => Ok(MetricKind::AbandonedRate),
            _ => Err(format!("unknown metric kind: {s}")),
        }
    }
}

/// Alert rule comparison condition.
///
/// # Examples
///
/// ```
/// use kpimon_common::types::Condition;
///
/// let cond: Condition = "below".parse().unwrap();
/// assert_eq!(cond, Condition::Below);
/// assert_eq!(cond.to_string(), "below");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Below,
    Above,
    /// Compares the current value's absolute magnitude to the threshold.
    /// This is NOT a delta against a prior period; no baseline is defined.
    ChangePercent,
}

impl Condition {
    /// Label used inside rendered alert messages.
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Below => "below",
            Condition::Above => "above",
            Condition::ChangePercent => "changed by more than",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Below => write!(f, "below"),
            Condition::Above => write!(f, "above"),
            Condition::ChangePercent => write!(f, "change_percent"),
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "below" => Ok(Condition::Below),
            "above" => Ok(Condition::Above),
            "change_percent" => Ok(Condition::ChangePercent),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

/// Raw funnel counts for one trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounts {
    /// Distinct sessions touched by funnel events in the window.
    pub total_sessions: u64,
    /// Sessions completed within the window.
    pub completed_sessions: u64,
    /// Completed purchases within the window.
    pub total_orders: u64,
}

/// Scalar health metrics derived from one window of [`FunnelCounts`].
///
/// Every zero-denominator case resolves to `0.0`. The values are never
/// NaN or infinite; the alert evaluator orders on them directly.
///
/// # Examples
///
/// ```
/// use kpimon_common::types::{FunnelCounts, MetricKind, MetricSnapshot};
///
/// let snap = MetricSnapshot::from_counts(FunnelCounts {
///     total_sessions: 10,
///     completed_sessions: 4,
///     total_orders: 2,
/// });
/// assert_eq!(snap.completion_rate, 40.0);
/// assert_eq!(snap.abandoned_rate, 60.0);
/// assert_eq!(snap.value(MetricKind::ConversionRate), 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricSnapshot {
    /// 完成率（%）
    pub completion_rate: f64,
    /// 日均会话数
    pub daily_sessions: f64,
    /// 转化率（%）
    pub conversion_rate: f64,
    /// 放弃率（%）
    pub abandoned_rate: f64,
}

impl MetricSnapshot {
    pub fn from_counts(counts: FunnelCounts) -> Self {
        let total = counts.total_sessions as f64;
        let completed = counts.completed_sessions as f64;
        let orders = counts.total_orders as f64;

        let completion_rate = if counts.total_sessions == 0 {
            0.0
        } else {
            completed / total * 100.0
        };
        let abandoned_rate = if counts.total_sessions == 0 {
            0.0
        } else {
            (total - completed) / total * 100.0
        };
        let conversion_rate = if counts.completed_sessions == 0 {
            0.0
        } else {
            orders / completed * 100.0
        };
        // Divisor is fixed at 7 regardless of the window length: the figure
        // is published as a weekly average even for wider windows.
        let daily_sessions = total / 7.0;

        Self {
            completion_rate,
            daily_sessions,
            conversion_rate,
            abandoned_rate,
        }
    }

    /// The single lookup path used by the alert evaluator.
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::CompletionRate => self.completion_rate,
            MetricKind::DailySessions => self.daily_sessions,
            MetricKind::ConversionRate => self.conversion_rate,
            MetricKind::AbandonedRate => self.abandoned_rate,
        }
    }
}

/// One triggered alert produced by a check run.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriggeredAlert {
    /// 规则唯一标识
    pub rule_id: String,
    /// 规则名称
    pub rule_name: String,
    /// 监控指标
    pub metric: MetricKind,
    /// 触发时的指标值
    pub value: f64,
    /// 触发时的阈值
    pub threshold: f64,
    /// 渲染后的告警消息
    pub message: String,
    /// 触发时间
    pub triggered_at: DateTime<Utc>,
}

/// 创建告警规则请求
///
/// All four core fields are optional at the serde layer so that a missing
/// field surfaces as a validation error (with no row written) instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateAlertRuleRequest {
    /// 规则名称（必填）
    pub name: Option<String>,
    /// 监控指标（必填：completion_rate / daily_sessions / conversion_rate / abandoned_rate）
    pub metric_type: Option<String>,
    /// 触发条件（必填：below / above / change_percent）
    pub condition: Option<String>,
    /// 阈值（必填，有限数）
    pub threshold: Option<f64>,
    /// 业务分类标签（可选）
    #[serde(default)]
    pub category: Option<String>,
    /// 触发冷却时间（秒，可选，默认 0 = 每次评估均可触发）
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
}

/// 更新告警规则请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateAlertRuleRequest {
    /// 规则名称（可选）
    pub name: Option<String>,
    /// 监控指标（可选）
    pub metric_type: Option<String>,
    /// 触发条件（可选）
    pub condition: Option<String>,
    /// 阈值（可选）
    pub threshold: Option<f64>,
    /// 业务分类标签（可选）
    pub category: Option<String>,
    /// 是否启用（可选）
    pub enabled: Option<bool>,
    /// 触发冷却时间（秒，可选）
    pub cooldown_secs: Option<u64>,
}
